use std::{
    io::{ErrorKind, Read, Write},
    time::Duration,
};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::{error::FrameError, transport::SerialLine};

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Servo line on a host serial device (USB-TTL adapter or UART).
pub struct SerialPortLine {
    port: Box<dyn SerialPort>,
}

impl SerialPortLine {
    pub fn open(path: &str, baud_rate: u32, poll_timeout: Duration) -> Result<Self, FrameError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(poll_timeout)
            .open()
            .map_err(|e| FrameError::Io(e.to_string()))?;

        info!("opened servo line {path} at {baud_rate} baud");
        Ok(Self { port })
    }
}

impl SerialLine for SerialPortLine {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.port.write_all(bytes).map_err(|e| FrameError::Io(e.to_string()))?;
        self.port.flush().map_err(|e| FrameError::Io(e.to_string()))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FrameError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(FrameError::Io(e.to_string())),
        }
    }

    fn clear_input(&mut self) -> Result<(), FrameError> {
        self.port.clear(ClearBuffer::Input).map_err(|e| FrameError::Io(e.to_string()))
    }
}
