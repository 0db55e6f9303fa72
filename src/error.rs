use thiserror::Error;

/// Failure of a single exchange on the servo wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("no response within timeout")]
    Timeout,
    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },
    #[error("malformed frame: {0}")]
    Malformed(&'static str),
    #[error("transmitted frame was not echoed back")]
    Echo,
    #[error("unexpected reply from id {id} (command {command})")]
    Unexpected { id: u8, command: u8 },
    #[error("serial i/o error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServoError {
    #[error("servo {id}: communication failed after {attempts} attempt(s)")]
    Communication {
        id: u8,
        attempts: u32,
        #[source]
        source: FrameError,
    },
    #[error("invalid response")]
    InvalidResponse,
    #[error("servo bus closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("art-net error: {0}")]
    ArtNet(String),
    #[error(transparent)]
    Servo(#[from] ServoError),
    #[error("bridge closed")]
    Closed,
}
