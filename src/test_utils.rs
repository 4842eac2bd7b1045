//! Test utilities for driving readers without a live engine
//!
//! This module provides a scripted in-memory [`FrameSource`] and packet builders
//! that are shared by unit tests, integration tests and benches.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::Vec3;

use crate::source::FrameSource;
use crate::types::{Energies, FramePacket, SessionInfo, StepTime};
use crate::{Result, StreamError};

/// Integration time step used by [`numbered_packet`].
pub const TEST_DT: f64 = 0.002;

/// Build a full packet whose every value encodes its position in the stream.
///
/// Positions are `(i, i, i)`, velocities `(-i, -i, -i)`, forces `(2i, 2i, 2i)`,
/// the step counter is `i` and the cell is a cube of edge `10 + i`.
pub fn numbered_packet(n_atoms: usize, i: usize) -> FramePacket {
    let value = i as f32;
    let edge = 10.0 + value;
    FramePacket::new()
        .with_time(StepTime { dt: TEST_DT, time: i as f64 * TEST_DT, step: i as i64 })
        .with_energies(Energies { step: i as i32, temperature: 300.0 + value, ..Energies::default() })
        .with_cell([[edge, 0.0, 0.0], [0.0, edge, 0.0], [0.0, 0.0, edge]])
        .with_positions(vec![Vec3::splat(value); n_atoms])
        .with_velocities(vec![Vec3::splat(-value); n_atoms])
        .with_forces(vec![Vec3::splat(2.0 * value); n_atoms])
}

/// Call counters shared between a [`ScriptedSource`] and the test holding it.
#[derive(Debug, Default)]
pub struct SourceStats {
    pulled: AtomicUsize,
    stops: AtomicUsize,
}

impl SourceStats {
    /// Number of `next_frame` calls that reached the script.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// A [`FrameSource`] replaying a fixed script of frames and failures.
pub struct ScriptedSource {
    session: SessionInfo,
    script: VecDeque<Result<FramePacket>>,
    stats: Arc<SourceStats>,
    stopped: bool,
}

impl ScriptedSource {
    /// `frames` numbered packets followed by end-of-stream.
    pub fn numbered(n_atoms: usize, frames: usize) -> Self {
        Self::from_script(SessionInfo::full(), (0..frames).map(|i| Ok(numbered_packet(n_atoms, i))))
    }

    /// `frames` numbered packets followed by a transport failure.
    pub fn failing_after(n_atoms: usize, frames: usize) -> Self {
        let script = (0..frames)
            .map(|i| Ok(numbered_packet(n_atoms, i)))
            .chain(std::iter::once(Err(StreamError::transport_failed("connection reset by peer"))));
        Self::from_script(SessionInfo::full(), script)
    }

    pub fn from_script(
        session: SessionInfo,
        script: impl IntoIterator<Item = Result<FramePacket>>,
    ) -> Self {
        Self {
            session,
            script: script.into_iter().collect(),
            stats: Arc::new(SourceStats::default()),
            stopped: false,
        }
    }

    /// Handle to the call counters, usable after the source moved into a reader.
    pub fn stats(&self) -> Arc<SourceStats> {
        Arc::clone(&self.stats)
    }
}

impl FrameSource for ScriptedSource {
    fn session_info(&self) -> SessionInfo {
        self.session
    }

    fn next_frame(&mut self) -> Result<Option<FramePacket>> {
        if self.stopped {
            return Ok(None);
        }
        self.stats.pulled.fetch_add(1, Ordering::SeqCst);
        self.script.pop_front().transpose()
    }

    fn stop(&mut self) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
        self.stopped = true;
        self.script.clear();
    }
}
