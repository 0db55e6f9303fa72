use crate::{
    model::{ChannelPair, PairDecoding},
    protocol::MAX_MOVE_TIME_MS,
};

pub const MAX_ANGLE: i32 = 24_000;
pub const INPUT_RANGE: f64 = 65_535.0;
/// Centidegrees travelled per millisecond of move time.
pub const DEFAULT_SPEED: i32 = 10;

/// Scaling from 16-bit DMX channel values to servo angles and move times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConstants {
    pub max_angle: i32,
    pub input_range: f64,
    pub speed: i32,
}

impl Default for MotionConstants {
    fn default() -> Self {
        Self { max_angle: MAX_ANGLE, input_range: INPUT_RANGE, speed: DEFAULT_SPEED }
    }
}

impl MotionConstants {
    /// Map a combined channel value to a target angle. A fully open channel
    /// (0xFFFF) lands exactly on `max_angle`, everything else scales and
    /// truncates toward zero.
    pub fn angle_for(&self, combined: i32) -> i32 {
        if combined == i32::from(u16::MAX) {
            self.max_angle
        } else {
            (combined as f64 * self.max_angle as f64 / self.input_range) as i32
        }
    }

    /// Move time for a given travel distance. Distances below one speed step
    /// yield an instantaneous move; the result never exceeds what the device
    /// accepts.
    pub fn duration_for(&self, distance: i32) -> u16 {
        if self.speed <= 0 {
            return 0;
        }
        u16::try_from(distance / self.speed).map_or(MAX_MOVE_TIME_MS, |ms| ms.min(MAX_MOVE_TIME_MS))
    }
}

pub fn combine(pair: ChannelPair, decoding: PairDecoding) -> i32 {
    let raw = u16::from_be_bytes([pair.hi, pair.lo]);
    match decoding {
        PairDecoding::Unsigned16 => i32::from(raw),
        PairDecoding::Signed16 => i32::from(raw as i16),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_hits_max_angle() {
        assert_eq!(MotionConstants::default().angle_for(0xFFFF), 24000);
    }

    #[test]
    fn scaling_matches_integer_floor() {
        let c = MotionConstants::default();
        for v in (0..0xFFFFi64).step_by(7).chain([21845, 39321, 43690, 4369, 0xFFFE]) {
            assert_eq!(i64::from(c.angle_for(v as i32)), v * 24000 / 65535, "value {v}");
        }
    }

    #[test]
    fn known_points() {
        let c = MotionConstants::default();
        assert_eq!(c.angle_for(0), 0);
        assert_eq!(c.angle_for(0x1000), 1500);
        assert_eq!(c.angle_for(0x0500), 468);
        assert_eq!(c.angle_for(0x8000), 12000);
    }

    #[test]
    fn pan_and_tilt_decode_high_bytes_differently() {
        let low = ChannelPair::new(0x10, 0x00);
        assert_eq!(combine(low, PairDecoding::Unsigned16), 0x1000);
        assert_eq!(combine(low, PairDecoding::Signed16), 0x1000);

        let high = ChannelPair::new(0x80, 0x00);
        assert_eq!(combine(high, PairDecoding::Unsigned16), 32768);
        assert_eq!(combine(high, PairDecoding::Signed16), -32768);

        let full = ChannelPair::new(0xFF, 0xFF);
        assert_eq!(combine(full, PairDecoding::Unsigned16), 65535);
        assert_eq!(combine(full, PairDecoding::Signed16), -1);
    }

    #[test]
    fn duration_uses_integer_division() {
        let c = MotionConstants::default();
        assert_eq!(c.duration_for(10000), 1000);
        assert_eq!(c.duration_for(9), 0);
        assert_eq!(c.duration_for(19), 1);
    }

    #[test]
    fn duration_is_capped_at_device_maximum() {
        let slow = MotionConstants { speed: 1, ..MotionConstants::default() };
        assert_eq!(slow.duration_for(24000), 24000);
        assert_eq!(slow.duration_for(36000), MAX_MOVE_TIME_MS);
        assert_eq!(slow.duration_for(i32::MAX), MAX_MOVE_TIME_MS);
    }

    #[test]
    fn substituted_constants() {
        let c = MotionConstants { max_angle: 1000, input_range: 1000.0, speed: 2 };
        assert_eq!(c.angle_for(500), 500);
        assert_eq!(c.duration_for(500), 250);
        assert_eq!(MotionConstants { speed: 0, ..c }.duration_for(500), 0);
    }
}
