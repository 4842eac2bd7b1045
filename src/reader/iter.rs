//! Stride-sampled forward iteration

use std::num::NonZeroUsize;

use tracing::debug;

use super::{FrameIndex, StreamingReader};
use crate::source::FrameSource;
use crate::types::Frame;
use crate::{Result, StreamError};

/// Every `step`-th frame of a [`StreamingReader`], starting at frame 0.
///
/// Borrows the reader for its lifetime. Beginning iteration consumes the
/// reader's one-time reopen, so a reader can only ever be iterated once.
///
/// Frames are lent one at a time through [`next_frame`](Self::next_frame);
/// each returned frame is the reader's live buffer and is overwritten by the
/// following call.
pub struct BoundedStepIterator<'r, S: FrameSource> {
    reader: &'r mut StreamingReader<S>,
    step: NonZeroUsize,
    begun: bool,
}

impl<'r, S: FrameSource> BoundedStepIterator<'r, S> {
    pub(crate) fn new(reader: &'r mut StreamingReader<S>, step: NonZeroUsize) -> Self {
        Self { reader, step, begun: false }
    }

    pub fn step(&self) -> usize {
        self.step.get()
    }

    /// Start iterating. Called implicitly by the first [`next_frame`](Self::next_frame).
    ///
    /// # Errors
    ///
    /// [`StreamError::UnsupportedOperation`] when this iterator or another one
    /// over the same reader has already begun.
    pub fn begin(&mut self) -> Result<()> {
        if self.begun {
            return Err(StreamError::unsupported("begin", "iteration has already begun"));
        }
        self.reader.reopen()?;
        self.begun = true;
        debug!("Iterating {} with step {}", self.reader.endpoint(), self.step);
        Ok(())
    }

    /// Next on-stride frame after auxiliaries and transformations ran.
    ///
    /// Off-stride frames are read and dropped without running the pipeline.
    /// Returns `Ok(None)` when the stream ends, including in the middle of a
    /// stride.
    pub fn next_frame(&mut self) -> Result<Option<&Frame>> {
        if !self.begun {
            self.begin()?;
        }

        let step = self.step.get() as i64;
        while (self.reader.current_index() + 1) % step != 0 {
            match self.reader.advance() {
                Ok(Some(_)) => {}
                Ok(None) => return Ok(None),
                Err(e) if e.ends_stream() => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        self.reader.next_frame()
    }

    /// Always fails: a sampled stream has no known length.
    pub fn len(&self) -> Result<usize> {
        Err(StreamError::unsupported("len", "the length of a sliced stream is unknown"))
    }

    /// Always fails: a stream cannot be indexed.
    pub fn get(&self, index: impl Into<FrameIndex>) -> Result<&Frame> {
        Err(StreamError::unsupported(
            "get",
            format!("cannot index a sliced stream ({:?})", index.into()),
        ))
    }
}
