//! IMD wire protocol.
//!
//! Every packet starts with an 8-byte header of two `i32` values in network
//! byte order: the packet type and a type-specific length field.
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────────────────┐
//! │ Type (4B BE) │ Length (4B)  │ Payload (type dependent) │
//! └──────────────┴──────────────┴──────────────────────────┘
//! ```
//!
//! The handshake's length field carries the protocol version in the engine's
//! native byte order; that byte order then applies to every payload.

mod codec;

pub use codec::{ImdCodec, Packet};

/// Header size in bytes.
pub const HEADER_SIZE: usize = 8;
/// Energies payload: one `i32` step and nine `f32` terms.
pub const ENERGIES_SIZE: usize = 40;
/// Time payload: `f64` dt, `f64` time, `i64` step.
pub const TIME_SIZE: usize = 24;
/// Box payload: three cell vectors of three `f32`.
pub const BOX_SIZE: usize = 36;
/// Session info payload: seven one-byte flags.
pub const SESSION_INFO_SIZE: usize = 7;

/// Packet types of IMD versions 2 and 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PacketType {
    Disconnect = 0,
    Energies = 1,
    Coordinates = 2,
    Go = 3,
    Handshake = 4,
    Kill = 5,
    MdComm = 6,
    Pause = 7,
    TransmissionRate = 8,
    IoError = 9,
    SessionInfo = 10,
    Resume = 11,
    Time = 12,
    Box = 13,
    Velocities = 14,
    Forces = 15,
    Wait = 16,
}

impl PacketType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        let kind = match raw {
            0 => PacketType::Disconnect,
            1 => PacketType::Energies,
            2 => PacketType::Coordinates,
            3 => PacketType::Go,
            4 => PacketType::Handshake,
            5 => PacketType::Kill,
            6 => PacketType::MdComm,
            7 => PacketType::Pause,
            8 => PacketType::TransmissionRate,
            9 => PacketType::IoError,
            10 => PacketType::SessionInfo,
            11 => PacketType::Resume,
            12 => PacketType::Time,
            13 => PacketType::Box,
            14 => PacketType::Velocities,
            15 => PacketType::Forces,
            16 => PacketType::Wait,
            _ => return None,
        };
        Some(kind)
    }
}

/// Byte order of payloads, fixed by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Commands a client sends to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start streaming after the handshake
    Go,
    Disconnect,
    /// Whether the engine should wait for a client after this one leaves (IMD v3).
    Wait(bool),
}

impl Command {
    /// Header `(type, length)` for this command. Commands carry no payload.
    pub fn header(self) -> (PacketType, i32) {
        match self {
            Command::Go => (PacketType::Go, 0),
            Command::Disconnect => (PacketType::Disconnect, 0),
            Command::Wait(wait) => (PacketType::Wait, i32::from(wait)),
        }
    }
}
