//! Forward-only trajectory reader over a live frame stream.
//!
//! A [`StreamingReader`] adapts a single-consumption [`FrameSource`] to the
//! trajectory contract. The one playback pattern a stream can support is
//! forward iteration, optionally every Nth frame:
//!
//! ```rust,no_run
//! use imdstream::{FrameSlice, ReaderConfig, StreamingReader};
//!
//! # fn main() -> imdstream::Result<()> {
//! let mut reader = StreamingReader::open("imd://localhost:8888", &ReaderConfig::with_atoms(1200))?;
//! let mut frames = reader.frames(FrameSlice::step(10))?;
//! while let Some(frame) = frames.next_frame()? {
//!     println!("frame {} at t={}", frame.frame, frame.time);
//! }
//! reader.close();
//! # Ok(())
//! # }
//! ```
//!
//! Construction consumes the first frame from the source to validate the
//! stream. That frame is kept as an untouched snapshot and replayed by the
//! first read, so iteration still starts at frame 0.
//!
//! Everything a seekable trajectory offers beyond that (length, rewinding,
//! copying, serialization, positional indexing) fails with a named error.

mod index;
mod iter;
mod pipeline;
mod state;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info, trace, warn};

pub use index::{FrameIndex, FrameSlice, check_slice};
pub use iter::BoundedStepIterator;
pub use pipeline::{AuxiliaryReader, Transformation};
pub use state::StreamState;

use crate::client::ImdClient;
use crate::config::ReaderConfig;
use crate::source::FrameSource;
use crate::trajectory::Trajectory;
use crate::types::{Frame, SessionInfo};
use crate::{Endpoint, Result, StreamError};

const SERIALIZATION_UNSUPPORTED: &str = "StreamingReader does not support serialization";

/// Reader over a live, non-rewindable frame stream.
///
/// Owns its [`FrameSource`] exclusively; closing or dropping the reader stops
/// the source. The frame buffer is overwritten on every read, so a frame
/// borrowed from one read must not be expected to stay stable across reads.
pub struct StreamingReader<S: FrameSource = ImdClient> {
    endpoint: Endpoint,
    n_atoms: usize,
    source: S,
    session: SessionInfo,

    /// Live frame buffer, overwritten in place
    ts: Frame,

    /// Frame 0 exactly as it was read, before any pipeline stage ran
    first_frame: Frame,

    state: StreamState,

    /// Index of the last frame delivered; -1 before the first read
    frame: i64,

    auxiliaries: Vec<(String, Box<dyn AuxiliaryReader>)>,
    transformations: Vec<Box<dyn Transformation>>,
    transformations_set: bool,
}

impl StreamingReader<ImdClient> {
    /// Connect to an IMD engine and prime the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `config.n_atoms` is unset ([`StreamError::MissingConfiguration`])
    /// - `url` is not of the form `imd://host:port` ([`StreamError::InvalidEndpoint`])
    /// - The engine cannot be reached or the handshake fails
    /// - The engine ends the stream before sending a frame ([`StreamError::EmptyStream`])
    pub fn open(url: &str, config: &ReaderConfig) -> Result<Self> {
        let options = &config.client;
        Self::open_with(url, config.n_atoms, |endpoint, n_atoms| {
            ImdClient::connect(endpoint, n_atoms, options)
        })
    }
}

impl<S: FrameSource> StreamingReader<S> {
    /// Open a reader over the source produced by `connect`.
    ///
    /// The atom count is checked before the endpoint is parsed, and both happen
    /// before `connect` runs, so configuration errors never cause network I/O.
    pub fn open_with<C>(url: &str, n_atoms: Option<usize>, connect: C) -> Result<Self>
    where
        C: FnOnce(&Endpoint, usize) -> Result<S>,
    {
        let n_atoms = n_atoms.ok_or_else(|| StreamError::missing_configuration("n_atoms"))?;
        let endpoint = Endpoint::parse(url)?;

        let mut source = connect(&endpoint, n_atoms)?;
        let session = source.session_info();
        let mut ts = Frame::new(n_atoms, &session);

        if let Err(e) = prime(&mut source, &mut ts) {
            source.stop();
            return Err(e);
        }
        let state = StreamState::Unprimed.primed()?;
        let first_frame = ts.clone();

        debug!("Primed stream from {} ({} atoms, {:?})", endpoint, n_atoms, session.version);

        Ok(Self {
            endpoint,
            n_atoms,
            source,
            session,
            ts,
            first_frame,
            state,
            frame: -1,
            auxiliaries: Vec::new(),
            transformations: Vec::new(),
            transformations_set: false,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn session_info(&self) -> SessionInfo {
        self.session
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Index of the last frame delivered, or -1 before the first read.
    pub fn current_index(&self) -> i64 {
        self.frame
    }

    /// The live frame buffer.
    pub fn ts(&self) -> &Frame {
        &self.ts
    }

    /// Frame 0 as read during construction. Never mutated.
    pub fn first_frame(&self) -> &Frame {
        &self.first_frame
    }

    /// Read the next frame without running auxiliaries or transformations.
    ///
    /// The first call replays the frame buffered at construction. Returns
    /// `Ok(None)` once the source has ended, whether cleanly or by a transport
    /// failure; no further frames are requested from it after that.
    ///
    /// # Errors
    ///
    /// [`StreamError::Closed`] after [`close`](Self::close); frame shape
    /// errors from a malformed packet.
    pub fn advance(&mut self) -> Result<Option<&Frame>> {
        if self.read_next_timestep()? { Ok(Some(&self.ts)) } else { Ok(None) }
    }

    /// Read the next frame and run it through auxiliaries, then transformations.
    pub fn next_frame(&mut self) -> Result<Option<&Frame>> {
        if !self.read_next_timestep()? {
            return Ok(None);
        }
        self.apply_pipeline()?;
        Ok(Some(&self.ts))
    }

    fn read_next_timestep(&mut self) -> Result<bool> {
        match self.state {
            StreamState::Closed => return Err(StreamError::Closed),
            StreamState::Unprimed => {
                return Err(StreamError::unsupported("read", "stream has not been primed"));
            }
            StreamState::Exhausted { .. } => return Ok(false),
            StreamState::Primed { .. } => {
                self.ts.clone_from(&self.first_frame);
                self.frame = 0;
                self.state = self.state.replayed();
                trace!("Frame 0 replayed from construction snapshot");
                return Ok(true);
            }
            StreamState::Iterating { .. } => {}
        }

        match self.source.next_frame() {
            Ok(Some(packet)) => {
                let frame = (self.frame + 1) as usize;
                self.ts.load_packet(frame, &packet)?;
                self.frame += 1;
                trace!("Frame {}: time={}", frame, self.ts.time);
                Ok(true)
            }
            Ok(None) | Err(StreamError::EndOfStream) => {
                info!("Stream {} ended after {} frames", self.endpoint, self.frame + 1);
                self.state = self.state.exhausted();
                Ok(false)
            }
            Err(e) if e.ends_stream() => {
                warn!(
                    "Stream {} ended by transport failure after {} frames: {}",
                    self.endpoint,
                    self.frame + 1,
                    e
                );
                self.state = self.state.exhausted();
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn apply_pipeline(&mut self) -> Result<()> {
        for (_, auxiliary) in &mut self.auxiliaries {
            auxiliary.update_frame(&mut self.ts)?;
        }
        for transformation in &mut self.transformations {
            transformation.apply(&mut self.ts)?;
        }
        Ok(())
    }

    /// Release the one-time iteration gate.
    ///
    /// Does not restart the stream or move the current index.
    ///
    /// # Errors
    ///
    /// [`StreamError::UnsupportedOperation`] on a second call.
    pub fn reopen(&mut self) -> Result<()> {
        self.state = self.state.reopen()?;
        debug!("Iteration gate released for {}", self.endpoint);
        Ok(())
    }

    /// Iterate the stream according to `index`.
    ///
    /// Only `..` and step-only slices are accepted.
    ///
    /// # Errors
    ///
    /// [`StreamError::UnsupportedSlice`] for integer indices, bounded slices
    /// and non-positive steps.
    pub fn frames(&mut self, index: impl Into<FrameIndex>) -> Result<BoundedStepIterator<'_, S>> {
        let step = check_slice(index.into())?;
        Ok(BoundedStepIterator::new(self, step))
    }

    /// Iterate every frame.
    pub fn iter(&mut self) -> BoundedStepIterator<'_, S> {
        BoundedStepIterator::new(self, std::num::NonZeroUsize::MIN)
    }

    /// Attach an auxiliary source under `name` and merge it into the current frame.
    ///
    /// # Errors
    ///
    /// [`StreamError::Pipeline`] when `name` is already attached.
    pub fn add_auxiliary(
        &mut self,
        name: impl Into<String>,
        mut auxiliary: impl AuxiliaryReader + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.auxiliaries.iter().any(|(existing, _)| *existing == name) {
            return Err(StreamError::pipeline(
                "auxiliary",
                format!("auxiliary name '{name}' is already in use"),
            ));
        }
        auxiliary.update_frame(&mut self.ts)?;
        debug!("Attached auxiliary '{}'", name);
        self.auxiliaries.push((name, Box::new(auxiliary)));
        Ok(())
    }

    /// Names of the attached auxiliary sources, in merge order.
    pub fn auxiliary_names(&self) -> impl Iterator<Item = &str> {
        self.auxiliaries.iter().map(|(name, _)| name.as_str())
    }

    /// Set the transformation stages and apply them to the current frame.
    ///
    /// # Errors
    ///
    /// [`StreamError::UnsupportedOperation`] when transformations were already set.
    pub fn add_transformations(&mut self, transformations: Vec<Box<dyn Transformation>>) -> Result<()> {
        if self.transformations_set {
            return Err(StreamError::unsupported(
                "add_transformations",
                "transformations can only be added once; open a new reader instead",
            ));
        }
        self.transformations_set = true;
        self.transformations = transformations;
        for transformation in &mut self.transformations {
            transformation.apply(&mut self.ts)?;
        }
        debug!("Attached {} transformations", self.transformations.len());
        Ok(())
    }

    /// Stop the source and release the connection.
    ///
    /// Safe to call repeatedly; only the first call has an effect.
    pub fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.source.stop();
        self.state = StreamState::Closed;
        info!("Closed stream reader for {} at frame {}", self.endpoint, self.frame);
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

/// Read the first frame into `ts`.
///
/// A stream that ends or drops its connection first is empty. Protocol
/// violations and timeouts keep their own error so a wrong atom count or a
/// stalled engine is not mistaken for an idle one.
fn prime<S: FrameSource>(source: &mut S, ts: &mut Frame) -> Result<()> {
    match source.next_frame() {
        Ok(Some(packet)) => ts.load_packet(0, &packet),
        Ok(None) | Err(StreamError::EndOfStream) => Err(StreamError::EmptyStream),
        Err(e @ StreamError::Transport { .. }) => {
            warn!("Stream ended by transport failure before the first frame: {}", e);
            Err(StreamError::EmptyStream)
        }
        Err(e) => Err(e),
    }
}

impl<S: FrameSource> Trajectory for StreamingReader<S> {
    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn n_frames(&self) -> Result<usize> {
        Err(StreamError::unsupported("n_frames", "the length of a live stream is unknown"))
    }

    fn len(&self) -> Result<usize> {
        Err(StreamError::unsupported("len", "the length of a live stream is unknown"))
    }

    fn rewind(&mut self) -> Result<()> {
        Err(StreamError::unsupported("rewind", "consumed frames cannot be read again from a stream"))
    }

    fn try_clone(&self) -> Result<Self> {
        Err(StreamError::unsupported("copy", "a live stream connection cannot be duplicated"))
    }

    fn next_frame(&mut self) -> Result<Option<&Frame>> {
        StreamingReader::next_frame(self)
    }

    fn close(&mut self) {
        StreamingReader::close(self);
    }
}

impl<S: FrameSource> Drop for StreamingReader<S> {
    fn drop(&mut self) {
        if !self.state.is_closed() {
            debug!("Dropping open stream reader for {}", self.endpoint);
            self.close();
        }
    }
}

impl<S: FrameSource> fmt::Debug for StreamingReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingReader")
            .field("endpoint", &self.endpoint)
            .field("n_atoms", &self.n_atoms)
            .field("state", &self.state)
            .field("frame", &self.frame)
            .field("auxiliaries", &self.auxiliary_names().collect::<Vec<_>>())
            .field("transformations", &self.transformations.len())
            .finish_non_exhaustive()
    }
}

impl<S: FrameSource> fmt::Display for StreamingReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<StreamingReader {} with continuous stream of {} atoms>",
            self.endpoint, self.n_atoms
        )
    }
}

impl<S: FrameSource> Serialize for StreamingReader<S> {
    fn serialize<Ser: Serializer>(&self, _serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        Err(serde::ser::Error::custom(SERIALIZATION_UNSUPPORTED))
    }
}

impl<'de, S: FrameSource> Deserialize<'de> for StreamingReader<S> {
    fn deserialize<D: Deserializer<'de>>(_deserializer: D) -> Result<Self, D::Error> {
        Err(serde::de::Error::custom(SERIALIZATION_UNSUPPORTED))
    }
}
