//! IMD frame source backed by a TCP connection.
//!
//! [`ImdClient`] connects to an engine, completes the handshake and then
//! decodes frames on a dedicated background thread. Frames are handed to the
//! consumer through a bounded channel; [`FrameSource::next_frame`] blocks on
//! that channel.
//!
//! `next_frame` must be called from synchronous code, never from inside an
//! async runtime.

mod producer;

use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientOptions;
use crate::source::FrameSource;
use crate::types::{FramePacket, SessionInfo};
use crate::{Endpoint, Result, StreamError};

/// Connection to a streaming simulation engine.
pub struct ImdClient {
    endpoint: Endpoint,

    /// Handshake result
    session: SessionInfo,

    /// Decoded frames, in production order
    frames: mpsc::Receiver<Result<FramePacket>>,

    /// Cancellation token for stopping the producer
    cancel: CancellationToken,

    /// Producer thread; `None` once stopped
    worker: Option<JoinHandle<()>>,
}

impl ImdClient {
    /// Connect to `endpoint` and complete the IMD handshake.
    ///
    /// Returns once the engine has announced its session and been told to start
    /// sending frames. Connecting starts the simulation's frame production.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine cannot be reached within the connect timeout
    /// - The handshake does not complete within the handshake timeout
    /// - The engine speaks an unsupported protocol version
    pub fn connect(endpoint: &Endpoint, n_atoms: usize, options: &ClientOptions) -> Result<Self> {
        info!("Connecting to IMD engine at {}", endpoint);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
            |e| StreamError::transport_failed_with_source("failed to start I/O runtime", Box::new(e)),
        )?;

        let (session_tx, session_rx) = oneshot::channel();
        let (frame_tx, frames) = mpsc::channel(options.buffer_frames.max(1));
        let cancel = CancellationToken::new();

        let task_endpoint = endpoint.clone();
        let task_options = options.clone();
        let task_cancel = cancel.clone();
        let worker = std::thread::Builder::new()
            .name("imd-producer".to_string())
            .spawn(move || {
                runtime.block_on(producer::run(
                    task_endpoint,
                    n_atoms,
                    task_options,
                    session_tx,
                    frame_tx,
                    task_cancel,
                ));
            })
            .map_err(|e| {
                StreamError::transport_failed_with_source("failed to spawn producer thread", Box::new(e))
            })?;

        let session = match session_rx.blocking_recv() {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                join_worker(worker);
                return Err(e);
            }
            Err(_) => {
                join_worker(worker);
                return Err(StreamError::transport_failed(
                    "producer exited before the handshake completed",
                ));
            }
        };

        info!("Connected to {} ({:?})", endpoint, session.version);

        Ok(Self { endpoint: endpoint.clone(), session, frames, cancel, worker: Some(worker) })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        self.worker.is_none()
    }
}

impl FrameSource for ImdClient {
    fn session_info(&self) -> SessionInfo {
        self.session
    }

    fn next_frame(&mut self) -> Result<Option<FramePacket>> {
        if self.is_stopped() {
            return Ok(None);
        }
        match self.frames.blocking_recv() {
            Some(Ok(packet)) => Ok(Some(packet)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        debug!("Stopping IMD producer for {}", self.endpoint);
        self.cancel.cancel();
        self.frames.close();
        join_worker(worker);
        info!("IMD client for {} shut down", self.endpoint);
    }
}

impl Drop for ImdClient {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join_worker(worker: JoinHandle<()>) {
    if worker.join().is_err() {
        warn!("IMD producer thread panicked");
    }
}
