use bytes::{Buf, BufMut, Bytes, BytesMut};
use glam::Vec3;
use tokio_util::codec::{Decoder, Encoder};

use super::{
    BOX_SIZE, ByteOrder, Command, ENERGIES_SIZE, HEADER_SIZE, PacketType, SESSION_INFO_SIZE,
    TIME_SIZE,
};
use crate::types::{Energies, ProtocolVersion, SessionInfo, StepTime};
use crate::{Result, StreamError};

/// A decoded engine-to-client packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Handshake(ProtocolVersion),
    SessionInfo(SessionInfo),
    Energies(Energies),
    Time(StepTime),
    /// Cell vectors, one per row
    Box([[f32; 3]; 3]),
    Coordinates(Vec<Vec3>),
    Velocities(Vec<Vec3>),
    Forces(Vec<Vec3>),
    Disconnect,
    IoError,
}

/// Codec for the IMD stream.
///
/// Decodes engine packets and encodes client [`Command`]s. It also encodes
/// [`Packet`]s, which is what an engine (or a test double of one) writes.
#[derive(Debug, Clone)]
pub struct ImdCodec {
    n_atoms: usize,
    byte_order: Option<ByteOrder>,
}

impl ImdCodec {
    /// Client-side codec; the byte order is learned from the handshake.
    pub fn new(n_atoms: usize) -> Self {
        Self { n_atoms, byte_order: None }
    }

    /// Engine-side codec writing payloads in `byte_order`.
    pub fn engine(n_atoms: usize, byte_order: ByteOrder) -> Self {
        Self { n_atoms, byte_order: Some(byte_order) }
    }

    /// Payload byte order, once known.
    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    fn decode_handshake(&mut self, raw_type: i32, length: [u8; 4]) -> Result<Packet> {
        if PacketType::from_raw(raw_type) != Some(PacketType::Handshake) {
            return Err(StreamError::protocol(
                "handshake",
                format!("expected handshake packet, received type {raw_type}"),
            ));
        }

        let little = i32::from_le_bytes(length);
        let big = i32::from_be_bytes(length);
        let (order, version) = if let Some(version) = ProtocolVersion::from_raw(little) {
            (ByteOrder::Little, version)
        } else if let Some(version) = ProtocolVersion::from_raw(big) {
            (ByteOrder::Big, version)
        } else {
            return Err(StreamError::protocol(
                "handshake",
                format!("unsupported IMD version {big}"),
            ));
        };

        self.byte_order = Some(order);
        Ok(Packet::Handshake(version))
    }

    fn payload_size(&self, kind: PacketType, length: i32) -> Result<usize> {
        let size = match kind {
            PacketType::SessionInfo => {
                if length as usize != SESSION_INFO_SIZE {
                    return Err(StreamError::protocol(
                        "session info",
                        format!("expected {SESSION_INFO_SIZE} flags, header announces {length}"),
                    ));
                }
                SESSION_INFO_SIZE
            }
            PacketType::Energies => ENERGIES_SIZE,
            PacketType::Time => TIME_SIZE,
            PacketType::Box => BOX_SIZE,
            PacketType::Coordinates | PacketType::Velocities | PacketType::Forces => {
                if length < 0 || length as usize != self.n_atoms {
                    return Err(StreamError::protocol(
                        format!("{kind:?} packet"),
                        format!("expected {} atoms, header announces {length}", self.n_atoms),
                    ));
                }
                self.n_atoms * 12
            }
            PacketType::Disconnect | PacketType::IoError => 0,
            PacketType::Handshake
            | PacketType::Go
            | PacketType::Kill
            | PacketType::MdComm
            | PacketType::Pause
            | PacketType::TransmissionRate
            | PacketType::Resume
            | PacketType::Wait => {
                return Err(StreamError::protocol(
                    "packet header",
                    format!("unexpected {kind:?} packet from engine"),
                ));
            }
        };
        Ok(size)
    }
}

impl Decoder for ImdCodec {
    type Item = Packet;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let raw_type = (&src[0..4]).get_i32();
        let mut length = [0u8; 4];
        length.copy_from_slice(&src[4..HEADER_SIZE]);

        let Some(order) = self.byte_order else {
            let packet = self.decode_handshake(raw_type, length)?;
            src.advance(HEADER_SIZE);
            return Ok(Some(packet));
        };

        let kind = PacketType::from_raw(raw_type).ok_or_else(|| {
            StreamError::protocol("packet header", format!("unknown packet type {raw_type}"))
        })?;
        let length = i32::from_be_bytes(length);
        let size = self.payload_size(kind, length)?;

        if src.len() < HEADER_SIZE + size {
            src.reserve(HEADER_SIZE + size - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let mut payload = Payload { buf: src.split_to(size).freeze(), order };

        let packet = match kind {
            PacketType::SessionInfo => {
                let mut flag = || payload.buf.get_u8() != 0;
                Packet::SessionInfo(SessionInfo {
                    version: ProtocolVersion::V3,
                    time: flag(),
                    energies: flag(),
                    dimensions: flag(),
                    positions: flag(),
                    wrapped_positions: flag(),
                    velocities: flag(),
                    forces: flag(),
                })
            }
            PacketType::Energies => Packet::Energies(Energies {
                step: payload.i32(),
                temperature: payload.f32(),
                total_energy: payload.f32(),
                potential_energy: payload.f32(),
                van_der_walls: payload.f32(),
                coulomb: payload.f32(),
                bonds: payload.f32(),
                angles: payload.f32(),
                dihedrals: payload.f32(),
                impropers: payload.f32(),
            }),
            PacketType::Time => {
                Packet::Time(StepTime { dt: payload.f64(), time: payload.f64(), step: payload.i64() })
            }
            PacketType::Box => Packet::Box([payload.vec3(), payload.vec3(), payload.vec3()]),
            PacketType::Coordinates => Packet::Coordinates(payload.atoms(self.n_atoms)),
            PacketType::Velocities => Packet::Velocities(payload.atoms(self.n_atoms)),
            PacketType::Forces => Packet::Forces(payload.atoms(self.n_atoms)),
            PacketType::Disconnect => Packet::Disconnect,
            PacketType::IoError => Packet::IoError,
            other => {
                return Err(StreamError::protocol(
                    "packet header",
                    format!("unexpected {other:?} packet from engine"),
                ));
            }
        };

        Ok(Some(packet))
    }
}

impl Encoder<Command> for ImdCodec {
    type Error = StreamError;

    fn encode(&mut self, command: Command, dst: &mut BytesMut) -> Result<()> {
        let (kind, length) = command.header();
        dst.reserve(HEADER_SIZE);
        dst.put_i32(kind as i32);
        dst.put_i32(length);
        Ok(())
    }
}

impl Encoder<Packet> for ImdCodec {
    type Error = StreamError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<()> {
        if let Packet::Handshake(version) = packet {
            let order = *self.byte_order.get_or_insert(ByteOrder::Little);
            dst.put_i32(PacketType::Handshake as i32);
            match order {
                ByteOrder::Little => dst.put_i32_le(version.as_raw()),
                ByteOrder::Big => dst.put_i32(version.as_raw()),
            }
            return Ok(());
        }

        let order = self.byte_order.ok_or_else(|| {
            StreamError::protocol("encode", "handshake must be written before data packets")
        })?;
        let mut out = PayloadWriter { dst, order };

        match packet {
            Packet::Handshake(_) => {}
            Packet::SessionInfo(info) => {
                out.header(PacketType::SessionInfo, SESSION_INFO_SIZE as i32);
                for flag in [
                    info.time,
                    info.energies,
                    info.dimensions,
                    info.positions,
                    info.wrapped_positions,
                    info.velocities,
                    info.forces,
                ] {
                    out.dst.put_u8(u8::from(flag));
                }
            }
            Packet::Energies(e) => {
                out.header(PacketType::Energies, 1);
                out.i32(e.step);
                for value in [
                    e.temperature,
                    e.total_energy,
                    e.potential_energy,
                    e.van_der_walls,
                    e.coulomb,
                    e.bonds,
                    e.angles,
                    e.dihedrals,
                    e.impropers,
                ] {
                    out.f32(value);
                }
            }
            Packet::Time(t) => {
                out.header(PacketType::Time, 1);
                out.f64(t.dt);
                out.f64(t.time);
                out.i64(t.step);
            }
            Packet::Box(cell) => {
                out.header(PacketType::Box, 1);
                for value in cell.iter().flatten() {
                    out.f32(*value);
                }
            }
            Packet::Coordinates(atoms) => out.atoms(PacketType::Coordinates, &atoms),
            Packet::Velocities(atoms) => out.atoms(PacketType::Velocities, &atoms),
            Packet::Forces(atoms) => out.atoms(PacketType::Forces, &atoms),
            Packet::Disconnect => out.header(PacketType::Disconnect, 0),
            Packet::IoError => out.header(PacketType::IoError, 0),
        }
        Ok(())
    }
}

struct Payload {
    buf: Bytes,
    order: ByteOrder,
}

impl Payload {
    fn i32(&mut self) -> i32 {
        match self.order {
            ByteOrder::Little => self.buf.get_i32_le(),
            ByteOrder::Big => self.buf.get_i32(),
        }
    }

    fn i64(&mut self) -> i64 {
        match self.order {
            ByteOrder::Little => self.buf.get_i64_le(),
            ByteOrder::Big => self.buf.get_i64(),
        }
    }

    fn f32(&mut self) -> f32 {
        match self.order {
            ByteOrder::Little => self.buf.get_f32_le(),
            ByteOrder::Big => self.buf.get_f32(),
        }
    }

    fn f64(&mut self) -> f64 {
        match self.order {
            ByteOrder::Little => self.buf.get_f64_le(),
            ByteOrder::Big => self.buf.get_f64(),
        }
    }

    fn vec3(&mut self) -> [f32; 3] {
        [self.f32(), self.f32(), self.f32()]
    }

    fn atoms(&mut self, n_atoms: usize) -> Vec<Vec3> {
        (0..n_atoms).map(|_| Vec3::from_array(self.vec3())).collect()
    }
}

struct PayloadWriter<'a> {
    dst: &'a mut BytesMut,
    order: ByteOrder,
}

impl PayloadWriter<'_> {
    fn header(&mut self, kind: PacketType, length: i32) {
        self.dst.put_i32(kind as i32);
        self.dst.put_i32(length);
    }

    fn i32(&mut self, value: i32) {
        match self.order {
            ByteOrder::Little => self.dst.put_i32_le(value),
            ByteOrder::Big => self.dst.put_i32(value),
        }
    }

    fn i64(&mut self, value: i64) {
        match self.order {
            ByteOrder::Little => self.dst.put_i64_le(value),
            ByteOrder::Big => self.dst.put_i64(value),
        }
    }

    fn f32(&mut self, value: f32) {
        match self.order {
            ByteOrder::Little => self.dst.put_f32_le(value),
            ByteOrder::Big => self.dst.put_f32(value),
        }
    }

    fn f64(&mut self, value: f64) {
        match self.order {
            ByteOrder::Little => self.dst.put_f64_le(value),
            ByteOrder::Big => self.dst.put_f64(value),
        }
    }

    fn atoms(&mut self, kind: PacketType, atoms: &[Vec3]) {
        self.header(kind, atoms.len() as i32);
        for atom in atoms {
            for value in atom.to_array() {
                self.f32(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_bytes(order: ByteOrder, n_atoms: usize, packets: Vec<Packet>) -> BytesMut {
        let mut codec = ImdCodec::engine(n_atoms, order);
        let mut buf = BytesMut::new();
        for packet in packets {
            codec.encode(packet, &mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn handshake_detects_little_endian_engine() {
        let mut buf = BytesMut::new();
        buf.put_i32(PacketType::Handshake as i32);
        buf.put_i32_le(3);

        let mut codec = ImdCodec::new(1);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Packet::Handshake(ProtocolVersion::V3)));
        assert_eq!(codec.byte_order(), Some(ByteOrder::Little));
        assert!(buf.is_empty());
    }

    #[test]
    fn handshake_detects_big_endian_engine() {
        let mut buf = BytesMut::new();
        buf.put_i32(PacketType::Handshake as i32);
        buf.put_i32(2);

        let mut codec = ImdCodec::new(1);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Packet::Handshake(ProtocolVersion::V2)));
        assert_eq!(codec.byte_order(), Some(ByteOrder::Big));
    }

    #[test]
    fn handshake_rejects_unknown_versions_and_types() {
        let mut buf = BytesMut::new();
        buf.put_i32(PacketType::Handshake as i32);
        buf.put_i32(7);
        assert!(matches!(ImdCodec::new(1).decode(&mut buf), Err(StreamError::Protocol { .. })));

        let mut buf = BytesMut::new();
        buf.put_i32(PacketType::Energies as i32);
        buf.put_i32(1);
        assert!(matches!(ImdCodec::new(1).decode(&mut buf), Err(StreamError::Protocol { .. })));
    }

    #[test]
    fn decodes_full_v3_frame_in_both_byte_orders() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let positions = vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.5, 0.0, 9.25)];
            let packets = vec![
                Packet::Handshake(ProtocolVersion::V3),
                Packet::SessionInfo(SessionInfo::full()),
                Packet::Time(StepTime { dt: 0.002, time: 4.0, step: 2000 }),
                Packet::Energies(Energies { step: 2000, temperature: 310.5, ..Default::default() }),
                Packet::Box([[5.0, 0.0, 0.0], [0.0, 6.0, 0.0], [0.0, 0.0, 7.0]]),
                Packet::Coordinates(positions.clone()),
                Packet::Velocities(vec![Vec3::ONE; 2]),
                Packet::Forces(vec![Vec3::NEG_ONE; 2]),
                Packet::Disconnect,
            ];
            let mut buf = engine_bytes(order, 2, packets.clone());

            let mut codec = ImdCodec::new(2);
            let mut decoded = Vec::new();
            while let Some(packet) = codec.decode(&mut buf).unwrap() {
                decoded.push(packet);
            }
            assert_eq!(decoded, packets, "byte order {order:?}");
        }
    }

    #[test]
    fn partial_payload_waits_for_more_data() {
        let mut full = engine_bytes(
            ByteOrder::Little,
            3,
            vec![Packet::Handshake(ProtocolVersion::V2), Packet::Coordinates(vec![Vec3::X; 3])],
        );
        let mut codec = ImdCodec::new(3);
        let mut buf = full.split_to(HEADER_SIZE + HEADER_SIZE + 10);
        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(Packet::Handshake(_))));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.unsplit(full);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Packet::Coordinates(vec![Vec3::X; 3])));
    }

    #[test]
    fn atom_count_mismatch_is_a_protocol_error() {
        let mut buf = engine_bytes(
            ByteOrder::Little,
            4,
            vec![Packet::Handshake(ProtocolVersion::V2), Packet::Coordinates(vec![Vec3::X; 4])],
        );
        let mut codec = ImdCodec::new(3);
        codec.decode(&mut buf).unwrap();
        assert!(matches!(codec.decode(&mut buf), Err(StreamError::Protocol { .. })));
    }

    #[test]
    fn client_commands_use_network_order() {
        let mut codec = ImdCodec::new(1);
        let mut buf = BytesMut::new();
        codec.encode(Command::Go, &mut buf).unwrap();
        codec.encode(Command::Wait(true), &mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 16, 0, 0, 0, 1]);
    }

    #[test]
    fn every_client_command_is_a_bare_header() {
        let commands = [
            (Command::Go, PacketType::Go, 0),
            (Command::Disconnect, PacketType::Disconnect, 0),
            (Command::Wait(false), PacketType::Wait, 0),
            (Command::Wait(true), PacketType::Wait, 1),
        ];
        for (command, kind, length) in commands {
            assert_eq!(command.header(), (kind, length));

            let mut buf = BytesMut::new();
            ImdCodec::new(1).encode(command, &mut buf).unwrap();
            assert_eq!(buf.len(), HEADER_SIZE);
        }
    }

    #[test]
    fn unexpected_engine_packet_is_rejected() {
        let mut buf = engine_bytes(ByteOrder::Big, 1, vec![Packet::Handshake(ProtocolVersion::V3)]);
        buf.put_i32(PacketType::MdComm as i32);
        buf.put_i32(0);
        let mut codec = ImdCodec::new(1);
        codec.decode(&mut buf).unwrap();
        assert!(matches!(codec.decode(&mut buf), Err(StreamError::Protocol { .. })));
    }
}
