//! Session metadata negotiated at handshake

use serde::{Deserialize, Serialize};

/// IMD protocol revision announced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Energies and positions only, no session packet.
    V2,
    /// Session packet announces which quantities follow.
    V3,
}

impl ProtocolVersion {
    /// Map the raw handshake number to a supported version.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            2 => Some(ProtocolVersion::V2),
            3 => Some(ProtocolVersion::V3),
            _ => None,
        }
    }

    /// The number carried in the handshake packet.
    pub fn as_raw(self) -> i32 {
        match self {
            ProtocolVersion::V2 => 2,
            ProtocolVersion::V3 => 3,
        }
    }
}

/// Which quantities the engine will send in every frame.
///
/// Returned once by the handshake and immutable afterwards; the reader uses it
/// to shape its frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub version: ProtocolVersion,
    pub time: bool,
    pub energies: bool,
    pub dimensions: bool,
    pub positions: bool,
    /// Positions are wrapped into the primary cell.
    pub wrapped_positions: bool,
    pub velocities: bool,
    pub forces: bool,
}

impl SessionInfo {
    /// Session implied by a version 2 handshake.
    pub fn v2() -> Self {
        Self {
            version: ProtocolVersion::V2,
            time: false,
            energies: true,
            dimensions: false,
            positions: true,
            wrapped_positions: false,
            velocities: false,
            forces: false,
        }
    }

    /// Session announcing every quantity, unwrapped positions.
    pub fn full() -> Self {
        Self {
            version: ProtocolVersion::V3,
            time: true,
            energies: true,
            dimensions: true,
            positions: true,
            wrapped_positions: false,
            velocities: true,
            forces: true,
        }
    }
}
