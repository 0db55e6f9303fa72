use std::sync::Arc;

use tracing::debug;

use crate::{
    bus::ServoBus,
    error::ServoError,
    model::ServoId,
    protocol::{self, Command, MAX_MOVE_TIME_MS, POSITION_UNITS},
    transport::SerialLine,
};

/// Centidegrees per device position unit (24000 / 1000).
pub const CENTIDEGREES_PER_UNIT: i32 = 24;

/// Full servo travel in centidegrees (240 degrees).
pub const FULL_TRAVEL: i32 = POSITION_UNITS as i32 * CENTIDEGREES_PER_UNIT;

/// Position and timed-move surface the motion mapper drives.
pub trait Actuator {
    /// Current position in centidegrees.
    fn read_position(&mut self) -> Result<i32, ServoError>;

    /// Move to `target` centidegrees over `duration_ms` milliseconds.
    fn move_to(&mut self, target: i32, duration_ms: u16) -> Result<(), ServoError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleLimits {
    pub min: i32,
    pub max: i32,
}

impl Default for AngleLimits {
    fn default() -> Self {
        Self { min: 0, max: FULL_TRAVEL }
    }
}

impl AngleLimits {
    pub fn clamp(&self, angle: i32) -> i32 {
        angle.clamp(self.min, self.max)
    }
}

/// One addressed LX-16A servo on a shared bus.
pub struct Servo<L: SerialLine> {
    bus: Arc<ServoBus<L>>,
    id: ServoId,
    limits: AngleLimits,
}

impl<L: SerialLine> Servo<L> {
    pub fn new(bus: Arc<ServoBus<L>>, id: ServoId) -> Self {
        Self { bus, id, limits: AngleLimits::default() }
    }

    pub fn with_limits(mut self, limits: AngleLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn id(&self) -> ServoId {
        self.id
    }

    pub fn limits(&self) -> AngleLimits {
        self.limits
    }

    /// Present position in centidegrees. Raw readings may be slightly
    /// negative or beyond full travel; they are passed through unchanged.
    pub fn pos_read(&self) -> Result<i32, ServoError> {
        let params = self.bus.request(self.id, Command::PosRead, &[])?;
        let raw = i16::from_le_bytes([params[0], params[1]]);
        Ok(i32::from(raw) * CENTIDEGREES_PER_UNIT)
    }

    /// Timed move. The target is clamped to this servo's limits and the
    /// time to the device maximum.
    pub fn move_time(&self, angle: i32, time_ms: u16) -> Result<(), ServoError> {
        let clamped = self.limits.clamp(angle);
        let units = u16::try_from(clamped / CENTIDEGREES_PER_UNIT).unwrap_or(0);
        let time_ms = time_ms.min(MAX_MOVE_TIME_MS);
        debug!(servo = %self.id, angle, clamped, time_ms, "move");
        self.bus.write_command(self.id, Command::MoveTimeWrite, &protocol::move_time_params(units, time_ms))
    }

    /// Last commanded target (centidegrees) and move time.
    pub fn move_time_read(&self) -> Result<(i32, u16), ServoError> {
        let params = self.bus.request(self.id, Command::MoveTimeRead, &[])?;
        let units = u16::from_le_bytes([params[0], params[1]]);
        let time_ms = u16::from_le_bytes([params[2], params[3]]);
        Ok((i32::from(units) * CENTIDEGREES_PER_UNIT, time_ms))
    }

    pub fn stop(&self) -> Result<(), ServoError> {
        self.bus.write_command(self.id, Command::MoveStop, &[])
    }

    /// Power (`true`) or release (`false`) the motor.
    pub fn set_load(&self, loaded: bool) -> Result<(), ServoError> {
        self.bus.write_command(self.id, Command::LoadOrUnloadWrite, &[u8::from(loaded)])
    }

    pub fn is_loaded(&self) -> Result<bool, ServoError> {
        let params = self.bus.request(self.id, Command::LoadOrUnloadRead, &[])?;
        Ok(params[0] != 0)
    }

    /// Supply voltage in millivolts.
    pub fn vin_read(&self) -> Result<u16, ServoError> {
        let params = self.bus.request(self.id, Command::VinRead, &[])?;
        Ok(u16::from_le_bytes([params[0], params[1]]))
    }

    /// Internal temperature in degrees Celsius.
    pub fn temp_read(&self) -> Result<u8, ServoError> {
        Ok(self.bus.request(self.id, Command::TempRead, &[])?[0])
    }

    /// Ask whichever servo is alone on the bus for its id.
    pub fn id_read(bus: &ServoBus<L>) -> Result<ServoId, ServoError> {
        let params = bus.request(ServoId::BROADCAST, Command::IdRead, &[])?;
        Ok(ServoId(params[0]))
    }
}

impl<L: SerialLine> Actuator for Servo<L> {
    fn read_position(&mut self) -> Result<i32, ServoError> {
        self.pos_read()
    }

    fn move_to(&mut self, target: i32, duration_ms: u16) -> Result<(), ServoError> {
        self.move_time(target, duration_ms)
    }
}
