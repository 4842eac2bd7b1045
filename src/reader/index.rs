//! Frame index requests and their validation

use std::num::NonZeroUsize;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::{Result, StreamError};

/// A `start:stop:step` request, each part optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSlice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl FrameSlice {
    /// Every frame (`[:]`)
    pub fn all() -> Self {
        Self::default()
    }

    /// Every `step`-th frame (`[::step]`)
    pub fn step(step: i64) -> Self {
        Self { step: Some(step), ..Self::default() }
    }
}

/// Ways a caller can index a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameIndex {
    /// A single frame position
    Frame(i64),
    Slice(FrameSlice),
}

impl From<i64> for FrameIndex {
    fn from(frame: i64) -> Self {
        FrameIndex::Frame(frame)
    }
}

impl From<FrameSlice> for FrameIndex {
    fn from(slice: FrameSlice) -> Self {
        FrameIndex::Slice(slice)
    }
}

impl From<RangeFull> for FrameIndex {
    fn from(_: RangeFull) -> Self {
        FrameIndex::Slice(FrameSlice::all())
    }
}

impl From<Range<i64>> for FrameIndex {
    fn from(range: Range<i64>) -> Self {
        FrameIndex::Slice(FrameSlice { start: Some(range.start), stop: Some(range.end), step: None })
    }
}

impl From<RangeFrom<i64>> for FrameIndex {
    fn from(range: RangeFrom<i64>) -> Self {
        FrameIndex::Slice(FrameSlice { start: Some(range.start), ..FrameSlice::default() })
    }
}

impl From<RangeTo<i64>> for FrameIndex {
    fn from(range: RangeTo<i64>) -> Self {
        FrameIndex::Slice(FrameSlice { stop: Some(range.end), ..FrameSlice::default() })
    }
}

/// Validate an index request against a forward-only stream.
///
/// Only slices without bounds are meaningful; the result is the stride to
/// iterate with (1 when no step was given).
pub fn check_slice(index: FrameIndex) -> Result<NonZeroUsize> {
    let slice = match index {
        FrameIndex::Slice(slice) => slice,
        FrameIndex::Frame(_) => {
            return Err(StreamError::unsupported_slice(
                "streamed trajectories must be indexed using a slice",
            ));
        }
    };

    if slice.start.is_some() {
        return Err(StreamError::unsupported_slice(
            "cannot expect a start index from a stream, 'start' must be None",
        ));
    }
    if slice.stop.is_some() {
        return Err(StreamError::unsupported_slice(
            "cannot expect a stop index from a stream, 'stop' must be None",
        ));
    }

    match slice.step {
        None => Ok(NonZeroUsize::MIN),
        Some(step) => usize::try_from(step).ok().and_then(NonZeroUsize::new).ok_or_else(|| {
            StreamError::unsupported_slice("cannot go backwards in a stream, 'step' must be > 0")
        }),
    }
}
