pub mod bridge;
pub mod bus;
pub mod config;
pub mod conversion;
pub mod dispatcher;
pub mod error;
pub mod mapper;
pub mod model;
pub mod node;
pub mod protocol;
pub mod servo;
pub mod transport;
pub mod transport_serial;

pub use bridge::{start_bridge, BridgeConfig, BridgeHandle, BridgeStats};
pub use bus::{BusConfig, ServoBus};
pub use config::AppConfig;
pub use conversion::MotionConstants;
pub use dispatcher::{DispatchReport, DmxFrame, FrameDispatcher};
pub use error::{BridgeError, FrameError, ServoError};
pub use mapper::{AxisController, AxisOutcome, MovePlan};
pub use model::{Axis, ChannelPair, PairDecoding, ServoId};
pub use node::{ArtNetReceiver, FrameSource, OwnedFrame};
pub use servo::{Actuator, AngleLimits, Servo};
pub use transport::SerialLine;
pub use transport_serial::SerialPortLine;
