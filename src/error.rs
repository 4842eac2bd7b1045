//! Error types for streaming trajectory access.
//!
//! Every failure in the crate is a [`StreamError`]. The variants fall into a few
//! groups that callers usually treat differently:
//!
//! - **Setup errors**: malformed endpoints, missing configuration, empty streams.
//!   Raised once, at construction, and never retried.
//! - **Stream termination**: end-of-stream and transport failures. The reader
//!   turns these into iteration termination instead of surfacing them.
//! - **Usage errors**: operations a forward-only stream cannot support
//!   (rewinding, length queries, copying, arbitrary indexing).
//!
//! ```rust
//! use imdstream::StreamError;
//!
//! let error = StreamError::transport_failed("connection reset by peer");
//! assert!(error.ends_stream());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for streaming trajectory operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("{reason}")]
    InvalidEndpoint { reason: String },

    #[error("{field} must be specified")]
    MissingConfiguration { field: String },

    #[error("No data found in stream")]
    EmptyStream,

    /// Clean end of a stream, for sources that signal it as an error.
    ///
    /// [`ImdClient`](crate::ImdClient) reports a clean end as `Ok(None)`; the
    /// reader treats both the same way.
    #[error("End of stream")]
    EndOfStream,

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Protocol error in {context}: {details}")]
    Protocol { context: String, details: String },

    #[error("Frame field '{field}' has {found} atoms, expected {expected}")]
    FrameShape { field: String, expected: usize, found: usize },

    #[error("{operation}: {reason}")]
    UnsupportedOperation { operation: String, reason: String },

    #[error("Unsupported slice: {reason}")]
    UnsupportedSlice { reason: String },

    #[error("Reader has been closed")]
    Closed,

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Pipeline stage '{stage}' failed: {details}")]
    Pipeline { stage: String, details: String },

    #[error("Configuration error in {path}: {details}")]
    Config { path: PathBuf, details: String },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Nothing in the reader retries on its own; this only guides callers that
    /// open a fresh reader after a failed connection attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { .. } => true,
            StreamError::Timeout { .. } => true,
            StreamError::EmptyStream => true,
            StreamError::InvalidEndpoint { .. } => false,
            StreamError::MissingConfiguration { .. } => false,
            StreamError::EndOfStream => false,
            StreamError::Protocol { .. } => false,
            StreamError::FrameShape { .. } => false,
            StreamError::UnsupportedOperation { .. } => false,
            StreamError::UnsupportedSlice { .. } => false,
            StreamError::Closed => false,
            StreamError::Pipeline { .. } => false,
            StreamError::Config { .. } => false,
        }
    }

    /// Returns whether this error marks the end of the frame stream.
    ///
    /// These are translated into iteration termination by the reader rather
    /// than being propagated to the consumer.
    pub fn ends_stream(&self) -> bool {
        matches!(
            self,
            StreamError::EndOfStream
                | StreamError::Transport { .. }
                | StreamError::Protocol { .. }
                | StreamError::Timeout { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::InvalidEndpoint { .. } => vec![
                "Use a connection string of the form imd://host:port",
                "Check that the port is a base-10 integer",
            ],
            StreamError::MissingConfiguration { .. } => vec![
                "Pass the atom count of the simulated system",
                "Check the reader configuration file for an n_atoms entry",
            ],
            StreamError::EmptyStream => vec![
                "Ensure the simulation engine is running and producing frames",
                "Check the engine's IMD output frequency settings",
            ],
            StreamError::EndOfStream => vec!["Open a new reader to consume another simulation run"],
            StreamError::Transport { .. } => vec![
                "Check that the simulation engine is still running",
                "Verify network connectivity to the engine host",
                "Open a new reader to reconnect",
            ],
            StreamError::Protocol { .. } => vec![
                "Verify the engine speaks IMD version 2 or 3",
                "Check that the configured atom count matches the simulation",
            ],
            StreamError::FrameShape { .. } => vec![
                "Check that the configured atom count matches the simulation",
            ],
            StreamError::UnsupportedOperation { .. } => vec![
                "Iterate the stream forward exactly once",
                "Collect the frames you need while iterating",
            ],
            StreamError::UnsupportedSlice { .. } => vec![
                "Use a full slice (..) or a step-only slice",
                "Use a positive integer step",
            ],
            StreamError::Closed => vec!["Open a new reader; closed readers cannot be resumed"],
            StreamError::Timeout { .. } => vec![
                "Increase the configured timeout",
                "Check that the simulation engine is responsive",
            ],
            StreamError::Pipeline { .. } => vec![
                "Check the auxiliary sources attached to the reader",
                "Check the transformations attached to the reader",
            ],
            StreamError::Config { .. } => vec![
                "Check that the configuration file exists and is readable",
                "Verify the YAML keys and value types",
            ],
        }
    }

    /// Helper constructor for endpoint parsing errors.
    pub fn invalid_endpoint(reason: impl Into<String>) -> Self {
        StreamError::InvalidEndpoint { reason: reason.into() }
    }

    /// Helper constructor for missing configuration errors.
    pub fn missing_configuration(field: impl Into<String>) -> Self {
        StreamError::MissingConfiguration { field: field.into() }
    }

    /// Helper constructor for transport errors.
    pub fn transport_failed(reason: impl Into<String>) -> Self {
        StreamError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for protocol violations.
    pub fn protocol(context: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Protocol { context: context.into(), details: details.into() }
    }

    /// Helper constructor for operations a forward-only stream cannot support.
    pub fn unsupported(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        StreamError::UnsupportedOperation { operation: operation.into(), reason: reason.into() }
    }

    /// Helper constructor for rejected slice requests.
    pub fn unsupported_slice(reason: impl Into<String>) -> Self {
        StreamError::UnsupportedSlice { reason: reason.into() }
    }

    /// Helper constructor for auxiliary and transformation failures.
    pub fn pipeline(stage: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Pipeline { stage: stage.into(), details: details.into() }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Transport { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                reason in "[a-zA-Z0-9 ]+",
                operation in "[a-z_]+",
                field in "[a-z_]+",
                expected in 1usize..100_000,
                found in 0usize..100_000,
            ) {
                let endpoint = StreamError::invalid_endpoint(reason.clone());
                prop_assert_eq!(endpoint.to_string(), reason.clone());

                let transport = StreamError::transport_failed(reason.clone());
                prop_assert!(transport.to_string().contains(&reason));

                let unsupported = StreamError::unsupported(operation.clone(), reason.clone());
                let msg = unsupported.to_string();
                prop_assert!(msg.contains(&operation));
                prop_assert!(msg.contains(&reason));

                let shape = StreamError::FrameShape { field: field.clone(), expected, found };
                let msg = shape.to_string();
                prop_assert!(msg.contains(&field));
                prop_assert!(msg.contains(&expected.to_string()));
                prop_assert!(msg.contains(&found.to_string()));
            }

            #[test]
            fn io_errors_become_transport_failures(reason in "[a-zA-Z ]+") {
                let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, reason.clone());
                let converted: StreamError = io_err.into();
                prop_assert!(converted.ends_stream());
                match converted {
                    StreamError::Transport { reason: msg, source } => {
                        prop_assert_eq!(msg, reason);
                        prop_assert!(source.is_some());
                    }
                    _ => prop_assert!(false, "Expected Transport error from io::Error conversion"),
                }
            }
        }
    }

    #[test]
    fn endpoint_messages_match_user_facing_text() {
        let error = StreamError::invalid_endpoint("URL must be in the format 'imd://host:port'");
        assert_eq!(error.to_string(), "URL must be in the format 'imd://host:port'");

        let error = StreamError::missing_configuration("n_atoms");
        assert_eq!(error.to_string(), "n_atoms must be specified");
    }

    #[test]
    fn stream_termination_classification() {
        assert!(StreamError::EndOfStream.ends_stream());
        assert!(StreamError::transport_failed("reset").ends_stream());
        assert!(StreamError::protocol("header", "bad type").ends_stream());
        assert!(StreamError::Timeout { duration: Duration::from_secs(1) }.ends_stream());

        assert!(!StreamError::EmptyStream.ends_stream());
        assert!(!StreamError::Closed.ends_stream());
        assert!(!StreamError::unsupported("rewind", "no").ends_stream());
        assert!(!StreamError::unsupported_slice("start").ends_stream());
    }

    #[test]
    fn usage_errors_are_never_retryable() {
        assert!(!StreamError::unsupported("len", "unknown").is_retryable());
        assert!(!StreamError::unsupported_slice("stop").is_retryable());
        assert!(!StreamError::invalid_endpoint("bad").is_retryable());
        assert!(!StreamError::missing_configuration("n_atoms").is_retryable());
        assert!(StreamError::transport_failed("reset").is_retryable());
    }

    #[test]
    fn every_variant_has_suggestions() {
        let errors = vec![
            StreamError::invalid_endpoint("x"),
            StreamError::missing_configuration("n_atoms"),
            StreamError::EmptyStream,
            StreamError::EndOfStream,
            StreamError::transport_failed("x"),
            StreamError::protocol("x", "y"),
            StreamError::FrameShape { field: "positions".into(), expected: 1, found: 2 },
            StreamError::unsupported("x", "y"),
            StreamError::unsupported_slice("x"),
            StreamError::Closed,
            StreamError::Timeout { duration: Duration::from_millis(10) },
            StreamError::pipeline("x", "y"),
            StreamError::Config { path: PathBuf::from("imd.yaml"), details: "x".into() },
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {error:?}");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<StreamError>();

        let error = StreamError::transport_failed("test");
        let _: &dyn std::error::Error = &error;
    }
}
