//! Streaming trajectory reader for the Interactive Molecular Dynamics (IMD) protocol.
//!
//! imdstream connects to a running simulation engine and exposes its live
//! frame stream through a forward-only trajectory interface.
//!
//! # Features
//!
//! - **Live frames**: positions, velocities, forces, box, energies and timing
//!   over IMD versions 2 and 3
//! - **Strided iteration**: every frame or every Nth frame, in engine order
//! - **Explicit limits**: rewinding, length queries, copying, serialization and
//!   positional indexing fail with named errors instead of wrong answers
//! - **Pluggable sources**: any [`FrameSource`] can feed a [`StreamingReader`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imdstream::{Imd, ReaderConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReaderConfig::with_atoms(1200);
//!     let mut reader = Imd::open("imd://localhost:8888", &config)?;
//!
//!     let mut frames = reader.iter();
//!     while let Some(frame) = frames.next_frame()? {
//!         println!("step {:?}: {:?}", frame.step(), frame.dimensions());
//!     }
//!     reader.close();
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
pub mod endpoint;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Stream access
pub mod client;
pub mod protocol;
pub mod reader;
pub mod source;
pub mod trajectory;

// Core exports
pub use config::{ClientOptions, ReaderConfig};
pub use endpoint::{Endpoint, format_hint};
pub use error::*;
pub use types::*;

// Stream exports
pub use client::ImdClient;
pub use reader::{
    AuxiliaryReader, BoundedStepIterator, FrameIndex, FrameSlice, StreamState, StreamingReader,
    Transformation,
};
pub use source::FrameSource;
pub use trajectory::Trajectory;

/// Entry point for `imd://` streams.
pub struct Imd;

impl Imd {
    /// Connect to an engine and return a primed reader.
    ///
    /// See [`StreamingReader::open`].
    pub fn open(url: &str, config: &ReaderConfig) -> Result<StreamingReader<ImdClient>> {
        StreamingReader::open(url, config)
    }

    /// Whether `candidate` names an IMD stream. Never fails.
    pub fn is_endpoint(candidate: &str) -> bool {
        format_hint(candidate)
    }
}
