use std::fmt;

/// Address of one device on the servo bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServoId(pub u8);

impl ServoId {
    pub const BROADCAST: ServoId = ServoId(254);
}

impl fmt::Display for ServoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Pan,
    Tilt,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pan => f.write_str("pan"),
            Axis::Tilt => f.write_str("tilt"),
        }
    }
}

/// Raw 16-bit DMX channel pair as it arrived on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelPair {
    pub hi: u8,
    pub lo: u8,
}

impl ChannelPair {
    pub fn new(hi: u8, lo: u8) -> Self {
        Self { hi, lo }
    }
}

/// How a channel pair is combined into a number before angle mapping.
///
/// The tilt axis historically combined its pair into a signed 16-bit value,
/// so high bytes of 0x80 and above come out negative. Pan uses the plain
/// unsigned value. Both are kept so existing fixtures keep moving the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairDecoding {
    Unsigned16,
    Signed16,
}

impl PairDecoding {
    pub fn for_axis(axis: Axis) -> Self {
        match axis {
            Axis::Pan => PairDecoding::Unsigned16,
            Axis::Tilt => PairDecoding::Signed16,
        }
    }
}
