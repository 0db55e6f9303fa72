use std::fmt;

use tracing::{debug, trace};

use crate::{
    conversion::MotionConstants,
    mapper::{AxisController, AxisOutcome},
    model::{Axis, ChannelPair},
    servo::Actuator,
};

/// Payload bytes shown in per-frame diagnostics.
pub const PREVIEW_LEN: usize = 16;
pub const PAN_OFFSET: usize = 1;
pub const TILT_OFFSET: usize = 3;

/// One inbound DMX frame, borrowed for the duration of a dispatch.
#[derive(Debug, Clone, Copy)]
pub struct DmxFrame<'a> {
    pub universe: u16,
    pub sequence: u8,
    pub data: &'a [u8],
}

impl DmxFrame<'_> {
    /// Channel pair starting at `offset`; bytes past the payload read as 0.
    pub fn pair_at(&self, offset: usize) -> ChannelPair {
        let byte = |i: usize| self.data.get(i).copied().unwrap_or(0);
        ChannelPair::new(byte(offset), byte(offset + 1))
    }
}

/// Hex dump of the first [`PREVIEW_LEN`] bytes, with `...` when truncated.
/// Formats on demand, so a disabled log level costs nothing.
#[derive(Debug, Clone, Copy)]
pub struct PayloadPreview<'a>(pub &'a [u8]);

impl fmt::Display for PayloadPreview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().take(PREVIEW_LEN).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:X}")?;
        }
        if self.0.len() > PREVIEW_LEN {
            f.write_str(" ...")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub pan: AxisOutcome,
    pub tilt: AxisOutcome,
}

/// Routes control frames of one universe to the pan and tilt servos.
pub struct FrameDispatcher<A: Actuator> {
    universe: u16,
    pan: AxisController,
    tilt: AxisController,
    pan_servo: A,
    tilt_servo: A,
}

impl<A: Actuator> FrameDispatcher<A> {
    pub fn new(pan_servo: A, tilt_servo: A, constants: MotionConstants) -> Self {
        Self {
            universe: 0,
            pan: AxisController::new(Axis::Pan, constants),
            tilt: AxisController::new(Axis::Tilt, constants),
            pan_servo,
            tilt_servo,
        }
    }

    pub fn with_universe(mut self, universe: u16) -> Self {
        self.universe = universe;
        self
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }

    pub fn servos(&self) -> (&A, &A) {
        (&self.pan_servo, &self.tilt_servo)
    }

    /// Handle one frame. Returns `None` for frames of other universes.
    pub fn handle_frame(&mut self, frame: &DmxFrame<'_>) -> Option<DispatchReport> {
        debug!(
            "DMX: univ {}, seq {}, data ({}): {}",
            frame.universe,
            frame.sequence,
            frame.data.len(),
            PayloadPreview(frame.data)
        );

        if frame.universe != self.universe {
            trace!(universe = frame.universe, "ignoring frame for other universe");
            return None;
        }

        let pan = self.pan.update(frame.pair_at(PAN_OFFSET), &mut self.pan_servo);
        let tilt = self.tilt.update(frame.pair_at(TILT_OFFSET), &mut self.tilt_servo);
        Some(DispatchReport { pan, tilt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServoError;

    #[derive(Default)]
    struct RecordingServo {
        position: i32,
        moves: Vec<(i32, u16)>,
    }

    impl Actuator for RecordingServo {
        fn read_position(&mut self) -> Result<i32, ServoError> {
            Ok(self.position)
        }

        fn move_to(&mut self, target: i32, duration_ms: u16) -> Result<(), ServoError> {
            self.moves.push((target, duration_ms));
            Ok(())
        }
    }

    fn dispatcher() -> FrameDispatcher<RecordingServo> {
        FrameDispatcher::new(RecordingServo::default(), RecordingServo::default(), MotionConstants::default())
    }

    fn frame(universe: u16, data: &[u8]) -> DmxFrame<'_> {
        DmxFrame { universe, sequence: 1, data }
    }

    #[test]
    fn first_frame_moves_both_axes() {
        let mut d = dispatcher();
        let report = d.handle_frame(&frame(0, &[0, 0x10, 0x00, 0x05, 0x00])).unwrap();

        assert_eq!(report.pan.moved().unwrap().target, 1500);
        assert_eq!(report.tilt.moved().unwrap().target, 468);
        let (pan, tilt) = d.servos();
        assert_eq!(pan.moves, vec![(1500, 150)]);
        assert_eq!(tilt.moves, vec![(468, 46)]);
    }

    #[test]
    fn other_universes_never_move() {
        let mut d = dispatcher();
        for universe in [1, 2, 3, 0x7FFF] {
            assert!(d.handle_frame(&frame(universe, &[0, 0xFF, 0xFF, 0xFF, 0xFF])).is_none());
        }
        let (pan, tilt) = d.servos();
        assert!(pan.moves.is_empty());
        assert!(tilt.moves.is_empty());
    }

    #[test]
    fn configured_universe_is_used() {
        let mut d = dispatcher().with_universe(3);
        assert!(d.handle_frame(&frame(0, &[0, 1, 0, 1, 0])).is_none());
        assert!(d.handle_frame(&frame(3, &[0, 1, 0, 1, 0])).is_some());
    }

    #[test]
    fn only_changed_axis_moves() {
        let mut d = dispatcher();
        d.handle_frame(&frame(0, &[0, 0x10, 0x00, 0x05, 0x00]));
        let report = d.handle_frame(&frame(0, &[9, 0x10, 0x00, 0x06, 0x00])).unwrap();

        assert_eq!(report.pan, AxisOutcome::Unchanged);
        assert!(report.tilt.moved().is_some());
        let (pan, tilt) = d.servos();
        assert_eq!(pan.moves.len(), 1);
        assert_eq!(tilt.moves.len(), 2);
    }

    #[test]
    fn short_payload_reads_missing_bytes_as_zero() {
        let f = frame(0, &[0, 0x12]);
        assert_eq!(f.pair_at(PAN_OFFSET), ChannelPair::new(0x12, 0));
        assert_eq!(f.pair_at(TILT_OFFSET), ChannelPair::new(0, 0));

        let mut d = dispatcher();
        let report = d.handle_frame(&f).unwrap();
        assert!(report.pan.moved().is_some());
        assert_eq!(report.tilt, AxisOutcome::Unchanged);

        assert!(d.handle_frame(&frame(0, &[])).is_some());
    }

    #[test]
    fn preview_is_truncated_after_sixteen_bytes() {
        assert_eq!(PayloadPreview(&[0x00, 0x1F, 0xA0]).to_string(), "0 1F A0");
        assert_eq!(PayloadPreview(&[]).to_string(), "");
        let exact: Vec<u8> = (0..16).collect();
        assert!(!PayloadPreview(&exact).to_string().contains("..."));
        let long: Vec<u8> = (0..20).collect();
        let preview = PayloadPreview(&long).to_string();
        assert!(preview.ends_with("F ..."));
        assert_eq!(preview.split(' ').count(), PREVIEW_LEN + 1);
    }
}
