//! Lifecycle of a streaming reader

use crate::{Result, StreamError};

/// Where a reader is in its single pass over the stream.
///
/// ```text
/// Unprimed ──prime──► Primed ──replay frame 0──► Iterating ──EOS──► Exhausted
///                        │                           │                  │
///                        └───────────── close ───────┴──────────────────┴──► Closed
/// ```
///
/// `reopened` records whether the one-time iteration gate has been released.
/// It never resets, and nothing moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Connected; first frame not read yet.
    Unprimed,
    /// First frame read and buffered; the next advance replays it.
    Primed { reopened: bool },
    /// Frames come straight from the source.
    Iterating { reopened: bool },
    /// The source reported end-of-stream or a transport failure.
    Exhausted { reopened: bool },
    Closed,
}

impl StreamState {
    pub fn is_reopened(self) -> bool {
        match self {
            StreamState::Primed { reopened }
            | StreamState::Iterating { reopened }
            | StreamState::Exhausted { reopened } => reopened,
            StreamState::Unprimed | StreamState::Closed => false,
        }
    }

    pub fn is_closed(self) -> bool {
        self == StreamState::Closed
    }

    /// The first frame has been buffered.
    pub(crate) fn primed(self) -> Result<Self> {
        match self {
            StreamState::Unprimed => Ok(StreamState::Primed { reopened: false }),
            other => Err(StreamError::unsupported(
                "prime",
                format!("stream is already primed ({other:?})"),
            )),
        }
    }

    /// The buffered first frame has been handed out.
    pub(crate) fn replayed(self) -> Self {
        match self {
            StreamState::Primed { reopened } => StreamState::Iterating { reopened },
            other => other,
        }
    }

    /// The source has nothing more to give.
    pub(crate) fn exhausted(self) -> Self {
        match self {
            StreamState::Primed { reopened } | StreamState::Iterating { reopened } => {
                StreamState::Exhausted { reopened }
            }
            other => other,
        }
    }

    /// Release the iteration gate. Allowed exactly once.
    pub(crate) fn reopen(self) -> Result<Self> {
        match self {
            StreamState::Closed => Err(StreamError::Closed),
            StreamState::Unprimed => {
                Err(StreamError::unsupported("reopen", "stream has not been primed"))
            }
            state if state.is_reopened() => {
                Err(StreamError::unsupported("reopen", "cannot reopen stream"))
            }
            StreamState::Primed { .. } => Ok(StreamState::Primed { reopened: true }),
            StreamState::Iterating { .. } => Ok(StreamState::Iterating { reopened: true }),
            StreamState::Exhausted { .. } => Ok(StreamState::Exhausted { reopened: true }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions() {
        let state = StreamState::Unprimed.primed().unwrap();
        assert_eq!(state, StreamState::Primed { reopened: false });

        let state = state.reopen().unwrap().replayed();
        assert_eq!(state, StreamState::Iterating { reopened: true });

        let state = state.exhausted();
        assert_eq!(state, StreamState::Exhausted { reopened: true });
        assert!(state.is_reopened());
    }

    #[test]
    fn reopen_is_allowed_once() {
        let state = StreamState::Primed { reopened: false }.reopen().unwrap();
        let err = state.reopen().unwrap_err();
        assert!(matches!(err, StreamError::UnsupportedOperation { .. }));
        assert!(err.to_string().contains("cannot reopen stream"));

        let err = state.replayed().exhausted().reopen().unwrap_err();
        assert!(matches!(err, StreamError::UnsupportedOperation { .. }));
    }

    #[test]
    fn closed_and_unprimed_reject_reopen() {
        assert!(matches!(StreamState::Closed.reopen(), Err(StreamError::Closed)));
        assert!(StreamState::Unprimed.reopen().is_err());
    }

    #[test]
    fn priming_happens_once() {
        assert!(StreamState::Primed { reopened: false }.primed().is_err());
        assert!(StreamState::Closed.primed().is_err());
    }

    #[test]
    fn terminal_states_absorb_transitions() {
        assert_eq!(StreamState::Closed.exhausted(), StreamState::Closed);
        assert_eq!(StreamState::Closed.replayed(), StreamState::Closed);
        assert!(StreamState::Closed.is_closed());
        assert_eq!(
            StreamState::Exhausted { reopened: false }.replayed(),
            StreamState::Exhausted { reopened: false }
        );
    }
}
