//! Reader configuration.
//!
//! Configuration can be built in code or loaded from YAML:
//!
//! ```rust
//! use imdstream::ReaderConfig;
//!
//! let config = ReaderConfig::from_yaml_str(
//!     "n_atoms: 1200\nclient:\n  buffer_frames: 64\n  recv_timeout_ms: 5000\n",
//! )
//! .unwrap();
//! assert_eq!(config.n_atoms, Some(1200));
//! assert_eq!(config.client.buffer_frames, 64);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, StreamError};

/// Options forwarded to the IMD client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Frames decoded ahead of the consumer before the socket reader waits.
    pub buffer_frames: usize,
    /// Timeout for establishing the TCP connection.
    pub connect_timeout_ms: u64,
    /// Timeout for receiving the handshake and session packets.
    pub handshake_timeout_ms: u64,
    /// Longest wait for a single frame; `None` waits forever.
    pub recv_timeout_ms: Option<u64>,
    /// Keep the engine running after this client disconnects.
    pub continue_after_disconnect: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            buffer_frames: 10,
            connect_timeout_ms: 5_000,
            handshake_timeout_ms: 5_000,
            recv_timeout_ms: None,
            continue_after_disconnect: false,
        }
    }
}

impl ClientOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn recv_timeout(&self) -> Option<Duration> {
        self.recv_timeout_ms.map(Duration::from_millis)
    }
}

/// Settings for opening a streaming reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Atom count of the simulated system. Required; the frame buffer is sized from it.
    pub n_atoms: Option<usize>,
    pub client: ClientOptions,
}

impl ReaderConfig {
    /// Configuration with the given atom count and default client options.
    pub fn with_atoms(n_atoms: usize) -> Self {
        Self { n_atoms: Some(n_atoms), client: ClientOptions::default() }
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::parse_yaml(yaml, PathBuf::from("<memory>"))
    }

    /// Load configuration from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| StreamError::Config {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        Self::parse_yaml(&yaml, path.to_path_buf())
    }

    fn parse_yaml(yaml: &str, path: PathBuf) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| StreamError::Config { path, details: e.to_string() })
    }

    /// The configured atom count.
    ///
    /// # Errors
    ///
    /// [`StreamError::MissingConfiguration`] when no atom count was given.
    pub fn require_atoms(&self) -> Result<usize> {
        self.n_atoms.ok_or_else(|| StreamError::missing_configuration("n_atoms"))
    }
}
