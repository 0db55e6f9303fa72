//! TOML configuration for the bridge binary.
//!
//! Every section and field is optional; the defaults reproduce the stock
//! pan/tilt head (pan on id 2, tilt on id 1, universe 0, one-pin wiring).

use std::{fs, net::SocketAddr, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    bridge::BridgeConfig,
    bus::BusConfig,
    conversion::{MotionConstants, DEFAULT_SPEED, INPUT_RANGE, MAX_ANGLE},
    error::BridgeError,
    model::ServoId,
    node::ARTNET_PORT,
    servo::{AngleLimits, FULL_TRAVEL},
    transport_serial::DEFAULT_BAUD_RATE,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub bus: BusSection,
    pub servos: ServoSection,
    pub motion: MotionSection,
    pub artnet: ArtNetSection,
    pub runtime: RuntimeSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// TX and RX tied together on the servo data pin.
    pub one_pin: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { port: "/dev/ttyUSB0".to_string(), baud_rate: DEFAULT_BAUD_RATE, one_pin: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BusSection {
    pub retries: u32,
    pub debug: bool,
    pub response_timeout_ms: u64,
}

impl Default for BusSection {
    fn default() -> Self {
        Self { retries: 0, debug: true, response_timeout_ms: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServoSection {
    pub pan_id: u8,
    pub tilt_id: u8,
    pub min_angle: i32,
    pub max_angle: i32,
}

impl Default for ServoSection {
    fn default() -> Self {
        Self { pan_id: 2, tilt_id: 1, min_angle: 0, max_angle: FULL_TRAVEL }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionSection {
    pub max_angle: i32,
    pub input_range: f64,
    pub speed: i32,
}

impl Default for MotionSection {
    fn default() -> Self {
        Self { max_angle: MAX_ANGLE, input_range: INPUT_RANGE, speed: DEFAULT_SPEED }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtNetSection {
    pub bind: SocketAddr,
    pub universe: u16,
}

impl Default for ArtNetSection {
    fn default() -> Self {
        Self { bind: SocketAddr::from(([0, 0, 0, 0], ARTNET_PORT)), universe: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeSection {
    pub step_period_ms: u64,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self { step_period_ms: 10 }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, BridgeError> {
        let cfg: Self = toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        for (name, id) in [("pan_id", self.servos.pan_id), ("tilt_id", self.servos.tilt_id)] {
            if id >= ServoId::BROADCAST.0 {
                return Err(BridgeError::Config(format!("servos.{name} {id} is not addressable")));
            }
        }
        if self.servos.pan_id == self.servos.tilt_id {
            return Err(BridgeError::Config("pan and tilt share one servo id".to_string()));
        }
        if self.servos.min_angle > self.servos.max_angle {
            return Err(BridgeError::Config("servos.min_angle exceeds servos.max_angle".to_string()));
        }
        if self.motion.input_range <= 0.0 {
            return Err(BridgeError::Config("motion.input_range must be positive".to_string()));
        }
        if self.motion.speed <= 0 {
            return Err(BridgeError::Config("motion.speed must be positive".to_string()));
        }
        if self.runtime.step_period_ms == 0 {
            return Err(BridgeError::Config("runtime.step_period_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            retries: self.bus.retries,
            debug: self.bus.debug,
            one_pin: self.serial.one_pin,
            response_timeout: Duration::from_millis(self.bus.response_timeout_ms),
        }
    }

    pub fn motion_constants(&self) -> MotionConstants {
        MotionConstants {
            max_angle: self.motion.max_angle,
            input_range: self.motion.input_range,
            speed: self.motion.speed,
        }
    }

    pub fn angle_limits(&self) -> AngleLimits {
        AngleLimits { min: self.servos.min_angle, max: self.servos.max_angle }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig { step_period: Duration::from_millis(self.runtime.step_period_ms) }
    }
}
