//! Producer task that owns the socket and assembles frames

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ClientOptions;
use crate::protocol::{Command, ImdCodec, Packet};
use crate::types::{FramePacket, ProtocolVersion, SessionInfo};
use crate::{Endpoint, Result, StreamError};

type PacketReader = FramedRead<OwnedReadHalf, ImdCodec>;
type CommandWriter = FramedWrite<OwnedWriteHalf, ImdCodec>;

const DISCONNECT_GRACE: Duration = Duration::from_millis(100);

/// One packet slot of a frame, in the order the engine sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Time,
    Energies,
    Box,
    Positions,
    Velocities,
    Forces,
}

fn frame_layout(session: &SessionInfo) -> Vec<Slot> {
    [
        (session.time, Slot::Time),
        (session.energies, Slot::Energies),
        (session.dimensions, Slot::Box),
        (session.positions, Slot::Positions),
        (session.velocities, Slot::Velocities),
        (session.forces, Slot::Forces),
    ]
    .into_iter()
    .filter_map(|(present, slot)| present.then_some(slot))
    .collect()
}

fn packet_name(packet: &Packet) -> &'static str {
    match packet {
        Packet::Handshake(_) => "handshake",
        Packet::SessionInfo(_) => "session info",
        Packet::Energies(_) => "energies",
        Packet::Time(_) => "time",
        Packet::Box(_) => "box",
        Packet::Coordinates(_) => "coordinates",
        Packet::Velocities(_) => "velocities",
        Packet::Forces(_) => "forces",
        Packet::Disconnect => "disconnect",
        Packet::IoError => "I/O error",
    }
}

/// Connect, handshake, then stream frames until the engine stops or `cancel` fires.
///
/// The handshake outcome is reported once through `session_tx`; frames (and a
/// final transport error, if any) go through `frame_tx`. Dropping `frame_tx`
/// marks the end of the stream.
pub(crate) async fn run(
    endpoint: Endpoint,
    n_atoms: usize,
    options: ClientOptions,
    session_tx: oneshot::Sender<Result<SessionInfo>>,
    frame_tx: mpsc::Sender<Result<FramePacket>>,
    cancel: CancellationToken,
) {
    let setup = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("Producer cancelled before handshake completed");
            return;
        }
        result = handshake(&endpoint, n_atoms, &options) => result,
    };

    let (mut reader, mut writer, session) = match setup {
        Ok(parts) => parts,
        Err(e) => {
            let _ = session_tx.send(Err(e));
            return;
        }
    };

    if session_tx.send(Ok(session)).is_err() {
        debug!("Client gave up before the handshake result arrived");
        return;
    }

    let layout = frame_layout(&session);
    let recv_timeout = options.recv_timeout();
    let mut frame_count = 0u64;

    info!("Producer started streaming from {}", endpoint);

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Producer cancelled");
                break;
            }
            result = read_frame(&mut reader, &layout, recv_timeout) => result,
        };

        match result {
            Ok(Some(packet)) => {
                frame_count += 1;
                trace!("Decoded frame {}", frame_count);

                let sent = tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = frame_tx.send(Ok(packet)) => sent,
                };
                if sent.is_err() {
                    debug!("Frame receiver dropped, shutting down");
                    break;
                }
            }
            Ok(None) => {
                info!("Engine ended the stream after {} frames", frame_count);
                break;
            }
            Err(e) => {
                warn!("Stream terminated by transport failure after {} frames: {}", frame_count, e);
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = frame_tx.send(Err(e)) => {}
                }
                break;
            }
        }
    }

    // Best effort: the engine may already be gone.
    if timeout(DISCONNECT_GRACE, writer.send(Command::Disconnect)).await.is_err() {
        debug!("Disconnect not acknowledged within {:?}", DISCONNECT_GRACE);
    }

    info!("Producer ended (decoded {} frames)", frame_count);
}

async fn handshake(
    endpoint: &Endpoint,
    n_atoms: usize,
    options: &ClientOptions,
) -> Result<(PacketReader, CommandWriter, SessionInfo)> {
    debug!("Connecting to {}", endpoint);

    let stream = timeout(options.connect_timeout(), TcpStream::connect(endpoint.socket_addr()))
        .await
        .map_err(|_| StreamError::Timeout { duration: options.connect_timeout() })?
        .map_err(|e| {
            StreamError::transport_failed_with_source(
                format!("failed to connect to {endpoint}"),
                Box::new(e),
            )
        })?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle's algorithm: {}", e);
    }

    let (read_half, write_half) = stream.into_split();
    let codec = ImdCodec::new(n_atoms);
    let mut reader = FramedRead::new(read_half, codec.clone());
    let mut writer = FramedWrite::new(write_half, codec);

    let session = timeout(options.handshake_timeout(), read_session(&mut reader))
        .await
        .map_err(|_| StreamError::Timeout { duration: options.handshake_timeout() })??;

    if frame_layout(&session).is_empty() {
        return Err(StreamError::protocol("session info", "engine announces no frame content"));
    }

    info!(
        version = ?session.version,
        positions = session.positions,
        velocities = session.velocities,
        forces = session.forces,
        "IMD handshake complete"
    );

    if session.version == ProtocolVersion::V3 {
        writer.send(Command::Wait(!options.continue_after_disconnect)).await?;
    }
    writer.send(Command::Go).await?;

    Ok((reader, writer, session))
}

async fn read_session(reader: &mut PacketReader) -> Result<SessionInfo> {
    let version = match reader.next().await {
        Some(Ok(Packet::Handshake(version))) => version,
        Some(Ok(other)) => {
            return Err(StreamError::protocol(
                "handshake",
                format!("expected handshake, received {}", packet_name(&other)),
            ));
        }
        Some(Err(e)) => return Err(e),
        None => return Err(StreamError::transport_failed("connection closed during handshake")),
    };

    match version {
        ProtocolVersion::V2 => Ok(SessionInfo::v2()),
        ProtocolVersion::V3 => match reader.next().await {
            Some(Ok(Packet::SessionInfo(info))) => Ok(info),
            Some(Ok(other)) => Err(StreamError::protocol(
                "handshake",
                format!("expected session info, received {}", packet_name(&other)),
            )),
            Some(Err(e)) => Err(e),
            None => Err(StreamError::transport_failed("connection closed before session info")),
        },
    }
}

/// Read the packets of one frame.
///
/// `Ok(None)` means the engine ended the stream cleanly at a frame boundary.
async fn read_frame(
    reader: &mut PacketReader,
    layout: &[Slot],
    recv_timeout: Option<Duration>,
) -> Result<Option<FramePacket>> {
    let mut frame = FramePacket::new();

    for (position, slot) in layout.iter().enumerate() {
        let next = match recv_timeout {
            Some(duration) => timeout(duration, reader.next())
                .await
                .map_err(|_| StreamError::Timeout { duration })?,
            None => reader.next().await,
        };

        let packet = match next {
            Some(Ok(Packet::Disconnect)) => {
                debug!("Engine sent disconnect");
                return Ok(None);
            }
            Some(Ok(Packet::IoError)) => {
                return Err(StreamError::transport_failed("engine reported an I/O error"));
            }
            Some(Ok(packet)) => packet,
            Some(Err(e)) => return Err(e),
            None if position == 0 => return Ok(None),
            None => return Err(StreamError::transport_failed("connection closed mid-frame")),
        };

        match (slot, packet) {
            (Slot::Time, Packet::Time(time)) => frame.time = Some(time),
            (Slot::Energies, Packet::Energies(energies)) => frame.energies = Some(energies),
            (Slot::Box, Packet::Box(cell)) => frame.cell = Some(cell),
            (Slot::Positions, Packet::Coordinates(atoms)) => frame.positions = Some(atoms),
            (Slot::Velocities, Packet::Velocities(atoms)) => frame.velocities = Some(atoms),
            (Slot::Forces, Packet::Forces(atoms)) => frame.forces = Some(atoms),
            (slot, other) => {
                return Err(StreamError::protocol(
                    "frame assembly",
                    format!("expected {slot:?} packet, received {}", packet_name(&other)),
                ));
            }
        }
    }

    Ok(Some(frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_session_flags_in_wire_order() {
        assert_eq!(frame_layout(&SessionInfo::v2()), vec![Slot::Energies, Slot::Positions]);
        assert_eq!(
            frame_layout(&SessionInfo::full()),
            vec![Slot::Time, Slot::Energies, Slot::Box, Slot::Positions, Slot::Velocities, Slot::Forces]
        );

        let forces_only = SessionInfo {
            time: false,
            energies: false,
            dimensions: false,
            positions: false,
            velocities: false,
            ..SessionInfo::full()
        };
        assert_eq!(frame_layout(&forces_only), vec![Slot::Forces]);
    }
}
