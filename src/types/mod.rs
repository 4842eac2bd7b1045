//! Core types for streamed simulation data.
//!
//! - [`Frame`] is the reader's mutable per-step buffer
//! - [`FramePacket`] is what a frame source yields for one step
//! - [`SessionInfo`] describes which quantities the engine sends
//! - [`triclinic_box`] converts cell vectors to lengths and angles
//!
//! ## Usage Example
//!
//! ```rust
//! use imdstream::types::{Frame, FramePacket, SessionInfo, StepTime};
//! use glam::Vec3;
//!
//! let mut frame = Frame::new(2, &SessionInfo::full());
//! let packet = FramePacket::new()
//!     .with_time(StepTime { dt: 0.002, time: 0.5, step: 250 })
//!     .with_positions(vec![Vec3::X, Vec3::Y]);
//!
//! frame.load_packet(0, &packet).unwrap();
//! assert_eq!(frame.step(), Some(250));
//! assert_eq!(frame.positions().unwrap()[1], Vec3::Y);
//! ```

mod cell;
mod frame;
mod packet;
mod session;

pub use cell::{Dimensions, triclinic_box};
pub use frame::Frame;
pub use packet::{Energies, FramePacket, StepTime};
pub use session::{ProtocolVersion, SessionInfo};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamError;
    use glam::Vec3;
    use proptest::prelude::*;

    fn atoms(n: usize, base: f32) -> Vec<Vec3> {
        (0..n).map(|i| Vec3::splat(base + i as f32)).collect()
    }

    #[test]
    fn new_frame_is_shaped_by_session() {
        let frame = Frame::new(4, &SessionInfo::v2());
        assert!(frame.has_positions());
        assert!(!frame.has_velocities());
        assert!(!frame.has_forces());
        assert_eq!(frame.positions().unwrap().len(), 4);
        assert_eq!(frame.dimensions(), None);

        let frame = Frame::new(4, &SessionInfo::full());
        assert_eq!(frame.velocities().unwrap(), &[Vec3::ZERO; 4]);
        assert_eq!(frame.forces().unwrap().len(), 4);
    }

    #[test]
    fn load_packet_overwrites_present_fields_only() {
        let mut frame = Frame::new(3, &SessionInfo::full());
        let first = FramePacket::new()
            .with_time(StepTime { dt: 0.002, time: 1.0, step: 500 })
            .with_energies(Energies { step: 500, temperature: 300.0, ..Default::default() })
            .with_cell([[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]])
            .with_positions(atoms(3, 1.0))
            .with_velocities(atoms(3, 2.0))
            .with_forces(atoms(3, 3.0));
        frame.load_packet(0, &first).unwrap();

        let second = FramePacket::new().with_positions(atoms(3, 10.0));
        frame.load_packet(1, &second).unwrap();

        assert_eq!(frame.frame, 1);
        assert_eq!(frame.positions().unwrap(), atoms(3, 10.0).as_slice());
        assert_eq!(frame.velocities().unwrap(), atoms(3, 2.0).as_slice());
        assert_eq!(frame.forces().unwrap(), atoms(3, 3.0).as_slice());
        assert_eq!(frame.time, 1.0);
        assert_eq!(frame.dt(), Some(0.002));
        assert_eq!(frame.step(), Some(500));
        assert_eq!(frame.data.get("temperature"), Some(&300.0));
        assert_eq!(frame.dimensions(), Some([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]));
    }

    #[test]
    fn energies_step_does_not_override_timing_step() {
        let mut frame = Frame::new(1, &SessionInfo::full());
        let packet = FramePacket::new()
            .with_time(StepTime { dt: 0.001, time: 0.1, step: 100 })
            .with_energies(Energies { step: 7, ..Default::default() });
        frame.load_packet(0, &packet).unwrap();

        assert_eq!(frame.step(), Some(100));
        assert!(frame.data.contains_key("potential_energy"));
    }

    #[test]
    fn load_packet_reuses_buffers() {
        let mut frame = Frame::new(2, &SessionInfo::v2());
        let before = frame.positions().unwrap().as_ptr();
        frame.load_packet(5, &FramePacket::new().with_positions(atoms(2, 0.5))).unwrap();
        assert_eq!(frame.positions().unwrap().as_ptr(), before);
    }

    #[test]
    fn load_packet_rejects_wrong_atom_count() {
        let mut frame = Frame::new(3, &SessionInfo::v2());
        let err = frame.load_packet(0, &FramePacket::new().with_positions(atoms(2, 0.0))).unwrap_err();
        assert!(matches!(
            err,
            StreamError::FrameShape { ref field, expected: 3, found: 2 } if field == "positions"
        ));
    }

    #[test]
    fn rejected_packet_leaves_frame_untouched() {
        let mut frame = Frame::new(3, &SessionInfo::full());
        let first = FramePacket::new()
            .with_time(StepTime { dt: 0.002, time: 1.0, step: 500 })
            .with_positions(atoms(3, 1.0));
        frame.load_packet(0, &first).unwrap();
        let before = frame.clone();

        let bad = FramePacket::new()
            .with_time(StepTime { dt: 0.004, time: 99.0, step: 99 })
            .with_energies(Energies { temperature: 999.0, ..Default::default() })
            .with_cell([[50.0, 0.0, 0.0], [0.0, 50.0, 0.0], [0.0, 0.0, 50.0]])
            .with_positions(atoms(3, 2.0))
            .with_forces(atoms(2, 3.0));
        let err = frame.load_packet(1, &bad).unwrap_err();

        assert!(matches!(
            err,
            StreamError::FrameShape { ref field, expected: 3, found: 2 } if field == "forces"
        ));
        assert_eq!(frame, before);
    }

    #[test]
    fn step_keeps_full_integer_precision() {
        let step = (1i64 << 53) + 1;
        let mut frame = Frame::new(1, &SessionInfo::full());
        frame.load_packet(0, &FramePacket::new().with_time(StepTime { dt: 0.002, time: 0.0, step })).unwrap();

        assert_eq!(frame.step(), Some(step));
        assert!(!frame.data.contains_key("step"));
    }

    #[test]
    fn protocol_version_mapping() {
        assert_eq!(ProtocolVersion::from_raw(2), Some(ProtocolVersion::V2));
        assert_eq!(ProtocolVersion::from_raw(3), Some(ProtocolVersion::V3));
        assert_eq!(ProtocolVersion::from_raw(4), None);
        assert_eq!(ProtocolVersion::V3.as_raw(), 3);
    }

    proptest! {
        #[test]
        fn loaded_positions_match_packet(n in 1usize..64, base in -100.0f32..100.0, index in 0usize..10_000) {
            let mut frame = Frame::new(n, &SessionInfo::v2());
            let positions = atoms(n, base);
            frame.load_packet(index, &FramePacket::new().with_positions(positions.clone())).unwrap();
            prop_assert_eq!(frame.frame, index);
            prop_assert_eq!(frame.positions().unwrap(), positions.as_slice());
        }
    }
}
