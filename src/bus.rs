use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::{
    error::{FrameError, ServoError},
    model::ServoId,
    protocol::{self, Command, Packet, HEADER, MAX_LEN, MIN_LEN},
    transport::SerialLine,
};

#[derive(Debug, Clone, Copy)]
pub struct BusConfig {
    /// Extra attempts after the first one fails. 0 disables retries.
    pub retries: u32,
    /// Log every frame on the wire.
    pub debug: bool,
    /// TX and RX share one pin, so every write comes back as echo.
    pub one_pin: bool,
    pub response_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { retries: 0, debug: false, one_pin: true, response_timeout: Duration::from_millis(20) }
    }
}

/// Half-duplex servo bus shared by every device on the wire.
///
/// The line sits behind a mutex, so exactly one request/response exchange
/// (including its retries) is in flight at any time.
pub struct ServoBus<L: SerialLine> {
    line: Mutex<L>,
    cfg: BusConfig,
}

impl<L: SerialLine> ServoBus<L> {
    pub fn new(line: L, cfg: BusConfig) -> Self {
        Self { line: Mutex::new(line), cfg }
    }

    pub fn config(&self) -> &BusConfig {
        &self.cfg
    }

    /// Send a command that the device does not answer.
    pub fn write_command(&self, id: ServoId, command: Command, params: &[u8]) -> Result<(), ServoError> {
        let frame = protocol::encode(id.0, command, params);
        self.with_retries(id, |line| self.transmit(line, &frame))
    }

    /// Send a query and return the parameter bytes of the device's reply.
    pub fn request(&self, id: ServoId, command: Command, params: &[u8]) -> Result<Vec<u8>, ServoError> {
        let expected_len = command.reply_len().ok_or(ServoError::InvalidResponse)?;
        let frame = protocol::encode(id.0, command, params);

        self.with_retries(id, |line| {
            self.transmit(line, &frame)?;
            let packet = self.read_response(line)?;
            let id_matches = id == ServoId::BROADCAST || packet.id == id.0;
            if !id_matches || packet.command != command.code() {
                return Err(FrameError::Unexpected { id: packet.id, command: packet.command });
            }
            if packet.params.len() != expected_len {
                return Err(FrameError::Malformed("unexpected parameter count"));
            }
            Ok(packet.params)
        })
    }

    fn with_retries<T>(
        &self,
        id: ServoId,
        mut exchange: impl FnMut(&mut L) -> Result<T, FrameError>,
    ) -> Result<T, ServoError> {
        let mut line = self.line.lock().map_err(|_| ServoError::Closed)?;
        let attempts = self.cfg.retries.saturating_add(1);
        let mut last = FrameError::Timeout;

        for attempt in 1..=attempts {
            match exchange(&mut *line) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(servo = %id, attempt, "bus exchange failed: {e}");
                    last = e;
                }
            }
        }

        Err(ServoError::Communication { id: id.0, attempts, source: last })
    }

    fn transmit(&self, line: &mut L, frame: &[u8]) -> Result<(), FrameError> {
        line.clear_input()?;
        if self.cfg.debug {
            debug!("tx {}", hex(frame));
        }
        line.write_all(frame)?;

        if self.cfg.one_pin {
            let mut echo = vec![0u8; frame.len()];
            let deadline = Instant::now() + self.cfg.response_timeout;
            match read_exact(line, &mut echo, deadline) {
                Ok(()) if echo == frame => {}
                Ok(()) | Err(FrameError::Timeout) => return Err(FrameError::Echo),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn read_response(&self, line: &mut L) -> Result<Packet, FrameError> {
        let deadline = Instant::now() + self.cfg.response_timeout;

        let mut prev = 0u8;
        loop {
            let mut byte = [0u8];
            read_exact(line, &mut byte, deadline)?;
            if prev == HEADER[0] && byte[0] == HEADER[1] {
                break;
            }
            prev = byte[0];
        }

        let mut head = [0u8; 2];
        read_exact(line, &mut head, deadline)?;
        // A run of 0x55 longer than the header: the real header ends later.
        while head[0] == HEADER[1] && !(MIN_LEN..=MAX_LEN).contains(&head[1]) {
            head[0] = head[1];
            read_exact(line, &mut head[1..], deadline)?;
        }
        let len = head[1];
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(FrameError::Malformed("length byte out of range"));
        }

        let mut body = vec![0u8; usize::from(len) + 1];
        body[..2].copy_from_slice(&head);
        read_exact(line, &mut body[2..], deadline)?;
        if self.cfg.debug {
            debug!("rx {} {}", hex(&HEADER), hex(&body));
        }

        protocol::decode_body(&body)
    }
}

fn read_exact<L: SerialLine>(line: &mut L, buf: &mut [u8], deadline: Instant) -> Result<(), FrameError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = line.read(&mut buf[filled..])?;
        filled += n;
        if n == 0 && Instant::now() >= deadline {
            return Err(FrameError::Timeout);
        }
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedLine;

    fn bus(line: &ScriptedLine, retries: u32, one_pin: bool) -> ServoBus<ScriptedLine> {
        let cfg = BusConfig { retries, debug: true, one_pin, response_timeout: Duration::from_millis(5) };
        ServoBus::new(line.clone(), cfg)
    }

    fn corrupt(mut frame: Vec<u8>) -> Vec<u8> {
        let last = frame.len() - 1;
        frame[last] = frame[last].wrapping_add(1);
        frame
    }

    #[test]
    fn request_skips_echo_and_returns_params() {
        let line = ScriptedLine::new(true);
        line.queue_reply(protocol::encode(1, Command::PosRead, &[0xF4, 0x01]));

        let params = bus(&line, 0, true).request(ServoId(1), Command::PosRead, &[]).unwrap();

        assert_eq!(params, vec![0xF4, 0x01]);
        assert_eq!(line.written(), protocol::encode(1, Command::PosRead, &[]));
    }

    #[test]
    fn request_without_echo_on_split_lines() {
        let line = ScriptedLine::new(false);
        line.queue_reply(protocol::encode(3, Command::TempRead, &[41]));

        let params = bus(&line, 0, false).request(ServoId(3), Command::TempRead, &[]).unwrap();
        assert_eq!(params, vec![41]);
    }

    #[test]
    fn noise_before_header_is_skipped() {
        let line = ScriptedLine::new(true);
        let mut reply = vec![0x00, 0x55, 0x13];
        reply.extend(protocol::encode(1, Command::VinRead, &[0x10, 0x2E]));
        line.queue_reply(reply);

        let params = bus(&line, 0, true).request(ServoId(1), Command::VinRead, &[]).unwrap();
        assert_eq!(params, vec![0x10, 0x2E]);
    }

    #[test]
    fn stray_header_byte_before_reply_is_skipped() {
        let line = ScriptedLine::new(true);
        let mut reply = vec![0x55];
        reply.extend(protocol::encode(1, Command::PosRead, &[0xF4, 0x01]));
        line.queue_reply(reply);

        let params = bus(&line, 0, true).request(ServoId(1), Command::PosRead, &[]).unwrap();
        assert_eq!(params, vec![0xF4, 0x01]);
    }

    #[test]
    fn long_header_run_before_reply_is_skipped() {
        let line = ScriptedLine::new(true);
        let mut reply = vec![0x12, 0x55, 0x55, 0x55];
        reply.extend(protocol::encode(2, Command::TempRead, &[40]));
        line.queue_reply(reply);

        let params = bus(&line, 0, true).request(ServoId(2), Command::TempRead, &[]).unwrap();
        assert_eq!(params, vec![40]);
    }

    #[test]
    fn exhausted_retries_surface_communication_error() {
        let line = ScriptedLine::new(true);
        for _ in 0..3 {
            line.queue_reply(corrupt(protocol::encode(1, Command::PosRead, &[0x00, 0x00])));
        }

        let err = bus(&line, 2, true).request(ServoId(1), Command::PosRead, &[]).unwrap_err();

        match err {
            ServoError::Communication { id, attempts, source } => {
                assert_eq!(id, 1);
                assert_eq!(attempts, 3);
                assert!(matches!(source, FrameError::Checksum { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(line.writes(), 3);
    }

    #[test]
    fn successful_retry_stops_retrying() {
        let line = ScriptedLine::new(true);
        line.queue_reply(corrupt(protocol::encode(1, Command::PosRead, &[0x00, 0x00])));
        line.queue_reply(protocol::encode(1, Command::PosRead, &[0x64, 0x00]));

        let params = bus(&line, 5, true).request(ServoId(1), Command::PosRead, &[]).unwrap();

        assert_eq!(params, vec![0x64, 0x00]);
        assert_eq!(line.writes(), 2);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let line = ScriptedLine::new(true);

        let err = bus(&line, 0, true).request(ServoId(2), Command::PosRead, &[]).unwrap_err();

        assert_eq!(err, ServoError::Communication { id: 2, attempts: 1, source: FrameError::Timeout });
        assert_eq!(line.writes(), 1);
    }

    #[test]
    fn reply_from_other_device_is_rejected() {
        let line = ScriptedLine::new(true);
        line.queue_reply(protocol::encode(7, Command::PosRead, &[0x00, 0x00]));

        let err = bus(&line, 0, true).request(ServoId(1), Command::PosRead, &[]).unwrap_err();
        assert!(matches!(
            err,
            ServoError::Communication { source: FrameError::Unexpected { id: 7, .. }, .. }
        ));
    }

    #[test]
    fn missing_echo_on_one_pin_line() {
        let line = ScriptedLine::new(false);

        let err = bus(&line, 0, true).write_command(ServoId(1), Command::MoveStop, &[]).unwrap_err();
        assert!(matches!(err, ServoError::Communication { source: FrameError::Echo, .. }));
    }

    #[test]
    fn write_command_does_not_wait_for_reply() {
        let line = ScriptedLine::new(true);

        bus(&line, 0, true)
            .write_command(ServoId(2), Command::MoveTimeWrite, &protocol::move_time_params(500, 100))
            .unwrap();

        assert_eq!(line.writes(), 1);
        assert_eq!(line.written()[4], Command::MoveTimeWrite.code());
    }

    #[test]
    fn write_only_command_cannot_be_requested() {
        let line = ScriptedLine::new(true);
        let err = bus(&line, 0, true).request(ServoId(1), Command::MoveStop, &[]).unwrap_err();
        assert_eq!(err, ServoError::InvalidResponse);
        assert_eq!(line.writes(), 0);
    }
}
