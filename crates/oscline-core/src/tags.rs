//! OSC type tags
//!
//! Standard tags from OSC 1.0 (`i f s b`) plus the widely supported
//! non-standard extensions. Tags are stored on the wire as single ASCII bytes;
//! the parser keeps the raw byte so unknown tags survive until a typed read.

use serde::{Deserialize, Serialize};

/// A type tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    /// `F`, non-standard, no payload
    False = b'F',
    /// `I`, non-standard, no payload
    Infinitum = b'I',
    /// `N`, non-standard, no payload
    Nil = b'N',
    /// `S`, non-standard alternate string
    AltString = b'S',
    /// `T`, non-standard, no payload
    True = b'T',
    /// `[`, non-standard, no payload
    ArrayStart = b'[',
    /// `]`, non-standard, no payload
    ArrayEnd = b']',
    /// `b`, standard
    Blob = b'b',
    /// `c`, non-standard ASCII character in a 4-byte slot
    AsciiChar = b'c',
    /// `d`, non-standard
    Float64 = b'd',
    /// `f`, standard
    Float32 = b'f',
    /// `h`, non-standard
    Int64 = b'h',
    /// `i`, standard
    Int32 = b'i',
    /// `m`, non-standard 4-byte MIDI message
    Midi = b'm',
    /// `r`, non-standard 32-bit RGBA color
    Color32 = b'r',
    /// `s`, standard
    String = b's',
    /// `t`, non-standard NTP time tag
    TimeTag = b't',
}

impl TypeTag {
    /// Map a raw tag byte to a known tag
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'F' => TypeTag::False,
            b'I' => TypeTag::Infinitum,
            b'N' => TypeTag::Nil,
            b'S' => TypeTag::AltString,
            b'T' => TypeTag::True,
            b'[' => TypeTag::ArrayStart,
            b']' => TypeTag::ArrayEnd,
            b'b' => TypeTag::Blob,
            b'c' => TypeTag::AsciiChar,
            b'd' => TypeTag::Float64,
            b'f' => TypeTag::Float32,
            b'h' => TypeTag::Int64,
            b'i' => TypeTag::Int32,
            b'm' => TypeTag::Midi,
            b'r' => TypeTag::Color32,
            b's' => TypeTag::String,
            b't' => TypeTag::TimeTag,
            _ => return None,
        })
    }

    /// The tag's wire byte
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Check whether a raw byte is a tag this crate understands
    #[inline]
    pub fn is_supported(byte: u8) -> bool {
        Self::from_byte(byte).is_some()
    }

    /// Payload size for fixed-width tags; `None` for strings and blobs.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            TypeTag::Int32
            | TypeTag::Float32
            | TypeTag::Color32
            | TypeTag::Midi
            | TypeTag::AsciiChar => Some(4),
            TypeTag::Int64 | TypeTag::Float64 | TypeTag::TimeTag => Some(8),
            TypeTag::True
            | TypeTag::False
            | TypeTag::Nil
            | TypeTag::Infinitum
            | TypeTag::ArrayStart
            | TypeTag::ArrayEnd => Some(0),
            TypeTag::String | TypeTag::AltString | TypeTag::Blob => None,
        }
    }

    /// Human-readable type name, used in type mismatch errors
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::False => "false",
            TypeTag::Infinitum => "infinitum",
            TypeTag::Nil => "nil",
            TypeTag::AltString => "alt string",
            TypeTag::True => "true",
            TypeTag::ArrayStart => "array start",
            TypeTag::ArrayEnd => "array end",
            TypeTag::Blob => "blob",
            TypeTag::AsciiChar => "ascii char",
            TypeTag::Float64 => "float64",
            TypeTag::Float32 => "float32",
            TypeTag::Int64 => "int64",
            TypeTag::Int32 => "int32",
            TypeTag::Midi => "midi",
            TypeTag::Color32 => "color32",
            TypeTag::String => "string",
            TypeTag::TimeTag => "timetag",
        }
    }
}

impl From<TypeTag> for u8 {
    fn from(tag: TypeTag) -> u8 {
        tag.as_byte()
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte_roundtrip() {
        for byte in b"FINSTb[]cdfhimrst" {
            let tag = TypeTag::from_byte(*byte).unwrap();
            assert_eq!(tag.as_byte(), *byte);
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(TypeTag::from_byte(b'x'), None);
        assert!(!TypeTag::is_supported(b'u'));
    }

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(TypeTag::Int32.fixed_size(), Some(4));
        assert_eq!(TypeTag::TimeTag.fixed_size(), Some(8));
        assert_eq!(TypeTag::True.fixed_size(), Some(0));
        assert_eq!(TypeTag::Blob.fixed_size(), None);
    }
}
