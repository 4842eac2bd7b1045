//! Connection-string parsing for IMD endpoints.
//!
//! An endpoint is written `imd://<host>:<port>`. Parsing is pure and performs no
//! network access, so [`format_hint`] can be used as a cheap probe when deciding
//! whether a string names a stream at all.

use std::fmt;
use std::str::FromStr;

use crate::{Result, StreamError};

/// Fixed scheme prefix of every IMD connection string.
pub const SCHEME: &str = "imd://";

const FORMAT_MESSAGE: &str = "URL must be in the format 'imd://host:port'";
const PORT_MESSAGE: &str = "Port must be an integer";

/// Validated host/port pair of a simulation engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Parse a connection string of the shape `imd://host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidEndpoint`] when the scheme is missing, when
    /// the remainder does not split into exactly two colon-separated parts, or
    /// when the port is not a base-10 integer.
    pub fn parse(connection: &str) -> Result<Self> {
        if !connection.starts_with(SCHEME) {
            return Err(StreamError::invalid_endpoint(FORMAT_MESSAGE));
        }

        // Only the text up to a repeated scheme belongs to this endpoint.
        let authority = connection.split(SCHEME).nth(1).unwrap_or_default();
        let parts: Vec<&str> = authority.split(':').collect();

        match parts.as_slice() {
            [host, port] => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| StreamError::invalid_endpoint(PORT_MESSAGE))?;
                Ok(Self { host: (*host).to_string(), port })
            }
            _ => Err(StreamError::invalid_endpoint(FORMAT_MESSAGE)),
        }
    }

    /// `host:port` form accepted by socket address resolution.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}:{}", SCHEME, self.host, self.port)
    }
}

/// Returns true when `candidate` parses as an IMD endpoint. Never fails.
pub fn format_hint(candidate: &str) -> bool {
    Endpoint::parse(candidate).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn well_formed_strings_round_trip(host in "[a-zA-Z0-9.-]{0,32}", port in any::<u16>()) {
            let endpoint = Endpoint::parse(&format!("imd://{host}:{port}")).unwrap();
            prop_assert_eq!(&endpoint.host, &host);
            prop_assert_eq!(endpoint.port, port);
            prop_assert!(format_hint(&endpoint.to_string()));
        }

        #[test]
        fn strings_without_scheme_are_rejected(s in "[a-z0-9:/.]{0,40}") {
            prop_assume!(!s.starts_with(SCHEME));
            let err = Endpoint::parse(&s).unwrap_err();
            prop_assert_eq!(err.to_string(), FORMAT_MESSAGE);
            prop_assert!(!format_hint(&s));
        }

        #[test]
        fn non_numeric_ports_are_rejected(host in "[a-z]{1,10}", port in "[a-z]{1,6}") {
            let err = Endpoint::parse(&format!("imd://{host}:{port}")).unwrap_err();
            prop_assert!(
                matches!(err, StreamError::InvalidEndpoint { .. }),
                "expected InvalidEndpoint, got {:?}",
                err
            );
            prop_assert_eq!(err.to_string(), PORT_MESSAGE);
        }
    }

    #[test]
    fn parses_localhost() {
        let endpoint: Endpoint = "imd://localhost:8888".parse().unwrap();
        assert_eq!(endpoint, Endpoint { host: "localhost".into(), port: 8888 });
        assert_eq!(endpoint.socket_addr(), "localhost:8888");
        assert_eq!(endpoint.to_string(), "imd://localhost:8888");
    }

    #[test]
    fn rejects_wrong_part_count() {
        for bad in ["imd://localhost", "imd://a:b:8888", "imd://", "imd://::"] {
            let err = Endpoint::parse(bad).unwrap_err();
            assert_eq!(err.to_string(), FORMAT_MESSAGE, "input {bad}");
        }
    }

    #[test]
    fn rejects_missing_or_wrong_scheme() {
        for bad in ["localhost:8888", "tcp://localhost:8888", "IMD://localhost:8888", ""] {
            let err = Endpoint::parse(bad).unwrap_err();
            assert_eq!(err.to_string(), FORMAT_MESSAGE, "input {bad}");
        }
    }

    #[test]
    fn rejects_non_integer_ports() {
        for bad in ["imd://localhost:port", "imd://localhost:", "imd://localhost:88.5"] {
            let err = Endpoint::parse(bad).unwrap_err();
            assert_eq!(err.to_string(), PORT_MESSAGE, "input {bad}");
        }
    }

    #[test]
    fn format_hint_never_fails() {
        assert!(format_hint("imd://127.0.0.1:5000"));
        assert!(!format_hint("trajectory.xtc"));
        assert!(!format_hint("imd://host:notaport"));
    }
}
