//! The forward-only trajectory contract

use crate::Result;
use crate::types::Frame;

/// Operations an analysis layer expects from any trajectory reader.
///
/// Seekable readers can answer all of them. A stream answers `n_frames`,
/// `len`, `rewind` and `try_clone` with
/// [`StreamError::UnsupportedOperation`](crate::StreamError::UnsupportedOperation)
/// naming the operation, never with a made-up value.
pub trait Trajectory {
    fn n_atoms(&self) -> usize;

    /// Total number of frames.
    fn n_frames(&self) -> Result<usize>;

    fn len(&self) -> Result<usize> {
        self.n_frames()
    }

    /// Move back to the first frame.
    fn rewind(&mut self) -> Result<()>;

    /// Independent reader at the same position.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;

    /// Read the next frame, after auxiliaries and transformations ran.
    fn next_frame(&mut self) -> Result<Option<&Frame>>;

    fn close(&mut self);
}
