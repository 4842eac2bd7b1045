//! Frame packets produced by a frame source

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Energy terms reported by the engine for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Energies {
    pub step: i32,
    pub temperature: f32,
    pub total_energy: f32,
    pub potential_energy: f32,
    pub van_der_walls: f32,
    pub coulomb: f32,
    pub bonds: f32,
    pub angles: f32,
    pub dihedrals: f32,
    pub impropers: f32,
}

impl Energies {
    /// Named terms in wire order, step first.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("step", f64::from(self.step)),
            ("temperature", f64::from(self.temperature)),
            ("total_energy", f64::from(self.total_energy)),
            ("potential_energy", f64::from(self.potential_energy)),
            ("van_der_walls", f64::from(self.van_der_walls)),
            ("coulomb", f64::from(self.coulomb)),
            ("bonds", f64::from(self.bonds)),
            ("angles", f64::from(self.angles)),
            ("dihedrals", f64::from(self.dihedrals)),
            ("impropers", f64::from(self.impropers)),
        ]
        .into_iter()
    }
}

/// Timing metadata for one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTime {
    /// Integration time step.
    pub dt: f64,
    /// Simulation time.
    pub time: f64,
    pub step: i64,
}

/// One frame as delivered by a [`FrameSource`](crate::source::FrameSource).
///
/// Every field is optional; absent fields leave the reader's frame buffer
/// untouched when the packet is loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePacket {
    pub time: Option<StepTime>,
    pub energies: Option<Energies>,
    /// Cell vectors, one per row.
    pub cell: Option<[[f32; 3]; 3]>,
    pub positions: Option<Vec<Vec3>>,
    pub velocities: Option<Vec<Vec3>>,
    pub forces: Option<Vec<Vec3>>,
}

impl FramePacket {
    /// Create an empty packet
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(mut self, time: StepTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_energies(mut self, energies: Energies) -> Self {
        self.energies = Some(energies);
        self
    }

    pub fn with_cell(mut self, cell: [[f32; 3]; 3]) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn with_positions(mut self, positions: Vec<Vec3>) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn with_velocities(mut self, velocities: Vec<Vec3>) -> Self {
        self.velocities = Some(velocities);
        self
    }

    pub fn with_forces(mut self, forces: Vec<Vec3>) -> Self {
        self.forces = Some(forces);
        self
    }
}
