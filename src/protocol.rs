//! LX-16A serial bus servo framing.
//!
//! ```text
//! 0x55 0x55 ID LEN CMD P1..Pn CHK     LEN = n + 3
//! CHK = !(ID + LEN + CMD + P1 + .. + Pn)
//! ```

use crate::error::FrameError;

pub const HEADER: [u8; 2] = [0x55, 0x55];

/// Smallest legal LEN byte (no parameters).
pub const MIN_LEN: u8 = 3;
/// Largest LEN byte any command produces.
pub const MAX_LEN: u8 = 10;

/// Device position units per full travel (0..1000 = 0..240 degrees).
pub const POSITION_UNITS: u16 = 1000;
pub const MAX_MOVE_TIME_MS: u16 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    MoveTimeWrite = 1,
    MoveTimeRead = 2,
    MoveStop = 12,
    IdRead = 14,
    TempRead = 26,
    VinRead = 27,
    PosRead = 28,
    LoadOrUnloadWrite = 31,
    LoadOrUnloadRead = 32,
}

impl Command {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Number of parameter bytes the device answers with, `None` for
    /// write-only commands.
    pub fn reply_len(self) -> Option<usize> {
        match self {
            Command::MoveTimeRead => Some(4),
            Command::IdRead | Command::TempRead | Command::LoadOrUnloadRead => Some(1),
            Command::VinRead | Command::PosRead => Some(2),
            Command::MoveTimeWrite | Command::MoveStop | Command::LoadOrUnloadWrite => None,
        }
    }
}

/// One decoded frame, either a request or a device reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: u8,
    pub command: u8,
    pub params: Vec<u8>,
}

/// Checksum over `ID LEN CMD params`.
pub fn checksum(body: &[u8]) -> u8 {
    !body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

pub fn encode(id: u8, command: Command, params: &[u8]) -> Vec<u8> {
    let len = params.len() as u8 + MIN_LEN;
    let mut frame = Vec::with_capacity(params.len() + 6);
    frame.extend_from_slice(&HEADER);
    frame.push(id);
    frame.push(len);
    frame.push(command.code());
    frame.extend_from_slice(params);
    let chk = checksum(&frame[2..]);
    frame.push(chk);
    frame
}

/// Decode `ID LEN CMD params CHK`, i.e. a frame with the header stripped.
pub fn decode_body(body: &[u8]) -> Result<Packet, FrameError> {
    if body.len() < usize::from(MIN_LEN) + 1 {
        return Err(FrameError::Malformed("frame too short"));
    }
    let len = body[1];
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(FrameError::Malformed("length byte out of range"));
    }
    // ID + LEN + (LEN - 1) bytes of CMD, params and CHK
    if body.len() != usize::from(len) + 1 {
        return Err(FrameError::Malformed("length byte does not match frame"));
    }
    let (content, chk) = body.split_at(body.len() - 1);
    let expected = checksum(content);
    if chk[0] != expected {
        return Err(FrameError::Checksum { expected, actual: chk[0] });
    }
    Ok(Packet { id: content[0], command: content[2], params: content[3..].to_vec() })
}

/// Decode a complete frame including the `0x55 0x55` header.
pub fn decode(frame: &[u8]) -> Result<Packet, FrameError> {
    match frame.strip_prefix(&HEADER[..]) {
        Some(body) => decode_body(body),
        None => Err(FrameError::Malformed("missing header")),
    }
}

pub fn move_time_params(position: u16, time_ms: u16) -> [u8; 4] {
    let [p0, p1] = position.to_le_bytes();
    let [t0, t1] = time_ms.to_le_bytes();
    [p0, p1, t0, t1]
}
