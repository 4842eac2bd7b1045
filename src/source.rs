//! Frame source trait for stream producers

use crate::types::{FramePacket, SessionInfo};
use crate::Result;

/// A blocking producer of simulation frames.
///
/// A frame source owns the connection to the engine and whatever background
/// machinery feeds it. Opening one starts remote frame production, so sources
/// are opened exactly once per reader and owned exclusively by it.
pub trait FrameSource: Send {
    /// Session metadata from the handshake
    fn session_info(&self) -> SessionInfo;

    /// Block until the next frame is available.
    ///
    /// Returns:
    /// - `Ok(Some(packet))` - Next frame, in production order
    /// - `Ok(None)` - Stream ended (normal termination)
    /// - `Err(StreamError::EndOfStream)` - Same as `Ok(None)`, for sources
    ///   that report termination as an error
    /// - `Err(e)` - Transport failure; the stream is over
    fn next_frame(&mut self) -> Result<Option<FramePacket>>;

    /// Stop production and release the connection.
    ///
    /// Must not block indefinitely and must tolerate repeated calls.
    fn stop(&mut self);
}
