use crate::error::FrameError;

/// Byte-level access to the shared servo wire.
pub trait SerialLine: Send + 'static {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), FrameError>;

    /// Read whatever is available into `buf`. Returns 0 when nothing arrived
    /// within the line's own poll timeout.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FrameError>;

    /// Drop stale input before a new exchange.
    fn clear_input(&mut self) -> Result<(), FrameError> {
        Ok(())
    }
}
