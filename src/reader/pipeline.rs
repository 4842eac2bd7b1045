//! Post-read stages applied to every delivered frame.
//!
//! After a frame is read, auxiliary sources are merged into it first, then the
//! transformations run in the order they were attached.

use crate::Result;
use crate::types::Frame;

/// Auxiliary data merged into each frame (e.g. values from a side channel).
pub trait AuxiliaryReader: Send {
    /// Rewrite or augment `frame` with this source's data for the same step.
    fn update_frame(&mut self, frame: &mut Frame) -> Result<()>;
}

impl<F> AuxiliaryReader for F
where
    F: FnMut(&mut Frame) -> Result<()> + Send,
{
    fn update_frame(&mut self, frame: &mut Frame) -> Result<()> {
        self(frame)
    }
}

/// In-place modification of a frame (centering, unit conversion, wrapping...).
pub trait Transformation: Send {
    fn apply(&mut self, frame: &mut Frame) -> Result<()>;
}

impl<F> Transformation for F
where
    F: FnMut(&mut Frame) -> Result<()> + Send,
{
    fn apply(&mut self, frame: &mut Frame) -> Result<()> {
        self(frame)
    }
}
