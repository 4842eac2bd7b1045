//! Mutable per-step frame buffer

use std::collections::BTreeMap;

use glam::Vec3;

use super::{Dimensions, FramePacket, SessionInfo, triclinic_box};
use crate::{Result, StreamError};

/// One simulation snapshot.
///
/// A reader owns a single `Frame` and overwrites it on every step; consumers
/// must not expect its contents to stay stable across steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 0-based position of this frame in the stream.
    pub frame: usize,
    n_atoms: usize,
    positions: Option<Vec<Vec3>>,
    velocities: Option<Vec<Vec3>>,
    forces: Option<Vec<Vec3>>,
    dimensions: Option<Dimensions>,
    /// Simulation time of this frame.
    pub time: f64,
    step: Option<i64>,
    /// Scalar per-frame values: `dt` and the named energy terms.
    pub data: BTreeMap<String, f64>,
}

impl Frame {
    /// Allocate a zeroed frame with buffers for the quantities the session announces.
    pub fn new(n_atoms: usize, session: &SessionInfo) -> Self {
        let buffer = |present: bool| present.then(|| vec![Vec3::ZERO; n_atoms]);
        Self {
            frame: 0,
            n_atoms,
            positions: buffer(session.positions),
            velocities: buffer(session.velocities),
            forces: buffer(session.forces),
            dimensions: None,
            time: 0.0,
            step: None,
            data: BTreeMap::new(),
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn positions(&self) -> Option<&[Vec3]> {
        self.positions.as_deref()
    }

    pub fn positions_mut(&mut self) -> Option<&mut [Vec3]> {
        self.positions.as_deref_mut()
    }

    pub fn velocities(&self) -> Option<&[Vec3]> {
        self.velocities.as_deref()
    }

    pub fn velocities_mut(&mut self) -> Option<&mut [Vec3]> {
        self.velocities.as_deref_mut()
    }

    pub fn forces(&self) -> Option<&[Vec3]> {
        self.forces.as_deref()
    }

    pub fn forces_mut(&mut self) -> Option<&mut [Vec3]> {
        self.forces.as_deref_mut()
    }

    pub fn has_positions(&self) -> bool {
        self.positions.is_some()
    }

    pub fn has_velocities(&self) -> bool {
        self.velocities.is_some()
    }

    pub fn has_forces(&self) -> bool {
        self.forces.is_some()
    }

    /// Cell as `[a, b, c, alpha, beta, gamma]`, if the stream has sent one.
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn set_dimensions(&mut self, dimensions: Option<Dimensions>) {
        self.dimensions = dimensions;
    }

    /// Integration time step, if the stream reports timing.
    pub fn dt(&self) -> Option<f64> {
        self.data.get("dt").copied()
    }

    /// Engine step counter, if the stream reports timing.
    pub fn step(&self) -> Option<i64> {
        self.step
    }

    /// Overwrite this frame in place with the fields present in `packet`.
    ///
    /// Absent fields keep their previous values. The energies' own step counter
    /// is not copied; `step` only ever comes from the timing packet.
    ///
    /// A packet with the wrong atom count is rejected before anything is
    /// written, leaving the frame exactly as it was.
    pub fn load_packet(&mut self, frame: usize, packet: &FramePacket) -> Result<()> {
        check_atoms("positions", self.n_atoms, packet.positions.as_deref())?;
        check_atoms("velocities", self.n_atoms, packet.velocities.as_deref())?;
        check_atoms("forces", self.n_atoms, packet.forces.as_deref())?;

        self.frame = frame;
        if let Some(time) = &packet.time {
            self.time = time.time;
            self.step = Some(time.step);
            self.data.insert("dt".to_string(), time.dt);
        }
        if let Some(energies) = &packet.energies {
            for (name, value) in energies.iter().filter(|(name, _)| *name != "step") {
                self.data.insert(name.to_string(), value);
            }
        }
        if let Some([x, y, z]) = packet.cell {
            self.dimensions = Some(triclinic_box(x, y, z));
        }

        copy_atoms(&mut self.positions, packet.positions.as_deref());
        copy_atoms(&mut self.velocities, packet.velocities.as_deref());
        copy_atoms(&mut self.forces, packet.forces.as_deref());

        Ok(())
    }
}

fn check_atoms(field: &str, n_atoms: usize, incoming: Option<&[Vec3]>) -> Result<()> {
    match incoming {
        Some(incoming) if incoming.len() != n_atoms => Err(StreamError::FrameShape {
            field: field.to_string(),
            expected: n_atoms,
            found: incoming.len(),
        }),
        _ => Ok(()),
    }
}

/// Lengths are checked by [`check_atoms`] first.
fn copy_atoms(buffer: &mut Option<Vec<Vec3>>, incoming: Option<&[Vec3]>) {
    let Some(incoming) = incoming else {
        return;
    };
    match buffer {
        Some(existing) => existing.copy_from_slice(incoming),
        None => *buffer = Some(incoming.to_vec()),
    }
}
