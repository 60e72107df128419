//! Fixed-size payload shapes
//!
//! Plain value structs carried as OSC elements. Each one documents its exact
//! wire layout; the reader and writer match it byte for byte.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 32-bit RGBA color (`r` tag)
///
/// Wire layout: `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    #[inline]
    pub fn to_be_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl std::fmt::Display for Color32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RGBA({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// 4-byte MIDI message (`m` tag)
///
/// Wire layout: `[port_id, status, data1, data2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MidiMessage {
    pub port_id: u8,
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    pub const fn new(port_id: u8, status: u8, data1: u8, data2: u8) -> Self {
        Self {
            port_id,
            status,
            data1,
            data2,
        }
    }

    #[inline]
    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    #[inline]
    pub fn to_be_bytes(self) -> [u8; 4] {
        [self.port_id, self.status, self.data1, self.data2]
    }

    /// MIDI channel (low nibble of the status byte)
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }
}

impl std::fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Port ID: {}, Status: {}, Data 1: {} , 2: {}",
            self.port_id, self.status, self.data1, self.data2
        )
    }
}

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// 64-bit NTP timestamp (`t` tag and bundle headers)
///
/// Wire layout: big-endian `seconds` then big-endian `fractions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NtpTimestamp {
    pub seconds: u32,
    pub fractions: u32,
}

impl NtpTimestamp {
    /// The OSC "immediately" time tag
    pub const IMMEDIATELY: NtpTimestamp = NtpTimestamp {
        seconds: 0,
        fractions: 1,
    };

    pub const fn new(seconds: u32, fractions: u32) -> Self {
        Self { seconds, fractions }
    }

    #[inline]
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self {
            seconds: u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            fractions: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    #[inline]
    pub fn to_be_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&self.seconds.to_be_bytes());
        out[4..].copy_from_slice(&self.fractions.to_be_bytes());
        out
    }

    /// Convert a wall-clock time. Times before 1970 clamp to the Unix epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        let since_unix = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        let seconds = since_unix.as_secs().wrapping_add(NTP_UNIX_OFFSET_SECS) as u32;
        let fractions = ((u64::from(since_unix.subsec_nanos()) << 32) / 1_000_000_000) as u32;
        Self { seconds, fractions }
    }

    /// Convert to wall-clock time. Times before 1970 clamp to the Unix epoch.
    pub fn to_system_time(self) -> SystemTime {
        let secs = u64::from(self.seconds).saturating_sub(NTP_UNIX_OFFSET_SECS);
        let nanos = (u64::from(self.fractions) * 1_000_000_000) >> 32;
        UNIX_EPOCH + Duration::new(secs, nanos as u32)
    }

    /// The current time
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }
}

/// NTP seconds with the fraction as nine decimal digits
impl std::fmt::Display for NtpTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::IMMEDIATELY {
            return f.write_str("immediately");
        }
        let nanos = (u64::from(self.fractions) * 1_000_000_000) >> 32;
        write!(f, "{}.{:09}", self.seconds, nanos)
    }
}

/// Two float32 elements (`ff`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Three float32 elements (`fff`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_display() {
        assert_eq!(Color32::new(255, 128, 0, 64).to_string(), "RGBA(255, 128, 0, 64)");
    }

    #[test]
    fn test_midi_channel() {
        let midi = MidiMessage::new(0, 0x93, 60, 100);
        assert_eq!(midi.channel(), 3);
        assert_eq!(midi.to_be_bytes(), [0, 0x93, 60, 100]);
    }

    #[test]
    fn test_timestamp_bytes() {
        let ts = NtpTimestamp::new(0x0102_0304, 0x0506_0708);
        assert_eq!(ts.to_be_bytes(), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(NtpTimestamp::from_be_bytes(ts.to_be_bytes()), ts);
    }

    #[test]
    fn test_timestamp_display() {
        assert_eq!(NtpTimestamp::IMMEDIATELY.to_string(), "immediately");
        assert_eq!(NtpTimestamp::new(0, 0).to_string(), "0.000000000");
        assert_eq!(NtpTimestamp::new(7, 0x8000_0000).to_string(), "7.500000000");
        assert_eq!(NtpTimestamp::new(7, 0x4000_0000).to_string(), "7.250000000");
        assert_eq!(NtpTimestamp::new(1, u32::MAX).to_string(), "1.999999999");
    }

    #[test]
    fn test_timestamp_system_time() {
        let time = UNIX_EPOCH + Duration::from_millis(1_700_000_000_250);
        let ts = NtpTimestamp::from_system_time(time);
        assert_eq!(u64::from(ts.seconds), 1_700_000_000 + NTP_UNIX_OFFSET_SECS);

        let back = ts.to_system_time();
        let drift = back
            .duration_since(time)
            .unwrap_or_else(|e| e.duration());
        assert!(drift < Duration::from_micros(1));
    }
}
