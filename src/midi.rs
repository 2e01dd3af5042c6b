//! MIDI short messages and value conversions

use std::fmt;

use crate::config::MidiCc;

/// Status nibble of a control change message
pub const CONTROL_CHANGE: i64 = 0xB0;

/// Three-byte MIDI short message as written to the output device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl ShortMessage {
    pub fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self { status, data1, data2 }
    }

    /// Build a control change for a 1-based channel.
    ///
    /// Fields are truncated to 8 bits without range checks, the same way a
    /// short-message device API masks its integer arguments.
    pub fn control_change(cc: &MidiCc, offset: i64, value: f32) -> Self {
        let status = CONTROL_CHANGE + i64::from(cc.channel) - 1;
        let number = i64::from(cc.number) + offset;
        Self {
            status: status as u8,
            data1: number as u8,
            data2: convert::unit_to_7bit(value),
        }
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    /// 1-based channel if this is a control change
    pub fn cc_channel(&self) -> Option<u8> {
        (self.status & 0xF0 == 0xB0).then(|| (self.status & 0x0F) + 1)
    }
}

impl fmt::Display for ShortMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cc_channel() {
            Some(channel) => write!(f, "CC ch:{} cc:{} v:{}", channel, self.data1, self.data2),
            None => write!(f, "{}", format_hex(&self.to_bytes())),
        }
    }
}

/// MIDI value conversion utilities
pub mod convert {
    /// Scale a unit float (0.0-1.0) to the 7-bit range.
    ///
    /// Rounds to nearest with ties away from zero. Out-of-range input is not
    /// clamped, the result wraps to 8 bits. NaN maps to 0.
    pub fn unit_to_7bit(value: f32) -> u8 {
        (value * 127.0).round() as i64 as u8
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
