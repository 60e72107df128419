//! Message writer
//!
//! [`OscWriter`] appends big-endian wire data to a fixed-capacity buffer.
//! Capacity is set once at construction; a write that does not fit fails with
//! [`Error::BufferTooSmall`] and leaves the cursor where it was, so a partly
//! built message is never silently truncated.
//!
//! Single-element messages go through
//! [`write_address_and_tags`](OscWriter::write_address_and_tags), which writes
//! the padded address and a precomputed 4-byte tag word in one call:
//!
//! ```text
//! "/synth/1/freq\0\0\0"  ",f\0\0"  43 dc 00 00
//!  address (16 bytes)    tag word   440.0f32
//! ```

use crate::parser::{align4, BUNDLE_PREFIX};
use crate::types::{Color32, MidiMessage, NtpTimestamp, Vector2, Vector3};
use crate::{Error, Result};

/// Default writer capacity in bytes
pub const DEFAULT_CAPACITY: usize = 4096;

/// Precomputed type tag strings for messages with up to two elements.
///
/// Each word is the comma, the tags, and null padding to 4 bytes, exactly as
/// it appears on the wire.
pub mod tag_word {
    pub const EMPTY: [u8; 4] = *b",\0\0\0";
    pub const INT32: [u8; 4] = *b",i\0\0";
    pub const INT64: [u8; 4] = *b",h\0\0";
    pub const FLOAT32: [u8; 4] = *b",f\0\0";
    pub const FLOAT64: [u8; 4] = *b",d\0\0";
    pub const STRING: [u8; 4] = *b",s\0\0";
    pub const BLOB: [u8; 4] = *b",b\0\0";
    pub const ASCII_CHAR: [u8; 4] = *b",c\0\0";
    pub const COLOR32: [u8; 4] = *b",r\0\0";
    pub const MIDI: [u8; 4] = *b",m\0\0";
    pub const TIMETAG: [u8; 4] = *b",t\0\0";
    pub const TRUE: [u8; 4] = *b",T\0\0";
    pub const FALSE: [u8; 4] = *b",F\0\0";
    pub const NIL: [u8; 4] = *b",N\0\0";
    pub const INFINITUM: [u8; 4] = *b",I\0\0";
    pub const VECTOR2: [u8; 4] = *b",ff\0";
}

/// Encoded size of a null-terminated, 4-byte padded string.
///
/// A string whose length is already a multiple of 4 still gets a full block
/// of four nulls, so the terminator is always present.
#[inline]
pub const fn padded_string_len(len: usize) -> usize {
    align4(len + 1)
}

/// Position of a bundle element's size field, returned by
/// [`OscWriter::begin_bundle_element`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "pass the mark to end_bundle_element to fill in the element size"]
pub struct ElementMark(usize);

/// Append-only encoder over a fixed-capacity buffer
pub struct OscWriter {
    buffer: Box<[u8]>,
    length: usize,
}

impl OscWriter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity].into_boxed_slice(),
            length: 0,
        }
    }

    /// Bytes written so far
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The encoded bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.length]
    }

    /// Rewind the cursor to zero. Old bytes stay in place and are overwritten
    /// by the next writes.
    #[inline]
    pub fn reset(&mut self) {
        self.length = 0;
    }

    /// Copy the encoded bytes into `dest`, returning the count copied
    pub fn copy_to(&self, dest: &mut [u8]) -> Result<usize> {
        if dest.len() < self.length {
            return Err(Error::BufferTooSmall {
                needed: self.length,
                have: dest.len(),
            });
        }
        dest[..self.length].copy_from_slice(self.as_bytes());
        Ok(self.length)
    }

    /// Claim `size` bytes at the cursor, returning the slot
    #[inline]
    fn claim(&mut self, size: usize) -> Result<&mut [u8]> {
        let start = self.length;
        let end = start + size;
        if end > self.buffer.len() {
            return Err(Error::BufferTooSmall {
                needed: end,
                have: self.buffer.len(),
            });
        }
        self.length = end;
        Ok(&mut self.buffer[start..end])
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.claim(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Write bytes followed by nulls up to `padded` total
    fn put_padded(&mut self, bytes: &[u8], padded: usize) -> Result<()> {
        let slot = self.claim(padded)?;
        slot[..bytes.len()].copy_from_slice(bytes);
        slot[bytes.len()..].fill(0);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Element payloads
    // ------------------------------------------------------------------

    #[inline]
    pub fn write_int(&mut self, value: i32) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    #[inline]
    pub fn write_float(&mut self, value: f32) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    #[inline]
    pub fn write_int64(&mut self, value: i64) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    #[inline]
    pub fn write_float64(&mut self, value: f64) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    #[inline]
    pub fn write_color(&mut self, value: Color32) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    #[inline]
    pub fn write_midi(&mut self, value: MidiMessage) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    #[inline]
    pub fn write_timestamp(&mut self, value: NtpTimestamp) -> Result<()> {
        self.put(&value.to_be_bytes())
    }

    /// Write a vector as two consecutive float32 payloads
    pub fn write_vector2(&mut self, value: Vector2) -> Result<()> {
        let slot = self.claim(8)?;
        slot[..4].copy_from_slice(&value.x.to_be_bytes());
        slot[4..].copy_from_slice(&value.y.to_be_bytes());
        Ok(())
    }

    /// Write a vector as three consecutive float32 payloads
    pub fn write_vector3(&mut self, value: Vector3) -> Result<()> {
        let slot = self.claim(12)?;
        slot[..4].copy_from_slice(&value.x.to_be_bytes());
        slot[4..8].copy_from_slice(&value.y.to_be_bytes());
        slot[8..].copy_from_slice(&value.z.to_be_bytes());
        Ok(())
    }

    /// Write an ASCII character into the last byte of a 4-byte slot
    pub fn write_char(&mut self, value: char) -> Result<()> {
        if !value.is_ascii() {
            return Err(Error::NonAscii);
        }
        self.put(&[0, 0, 0, value as u8])
    }

    /// Write a null-terminated, padded ASCII string
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        if !value.is_ascii() {
            return Err(Error::NonAscii);
        }
        self.put_padded(value.as_bytes(), padded_string_len(value.len()))
    }

    /// Write a blob: big-endian length, the bytes, then padding to 4
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<()> {
        let size = u32::try_from(bytes.len()).map_err(|_| Error::BufferTooSmall {
            needed: bytes.len(),
            have: u32::MAX as usize,
        })?;
        let slot = self.claim(4 + align4(bytes.len()))?;
        slot[..4].copy_from_slice(&size.to_be_bytes());
        slot[4..4 + bytes.len()].copy_from_slice(bytes);
        slot[4 + bytes.len()..].fill(0);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Addresses and tags
    // ------------------------------------------------------------------

    /// Write a message address
    pub fn write_address(&mut self, address: &str) -> Result<()> {
        if !address.starts_with('/') {
            return Err(Error::MissingAddressSlash);
        }
        self.write_string(address)
    }

    /// Write a type tag string; the leading comma is added
    pub fn write_tags(&mut self, tags: &str) -> Result<()> {
        if !tags.is_ascii() {
            return Err(Error::NonAscii);
        }
        let slot = self.claim(padded_string_len(tags.len() + 1))?;
        slot[0] = b',';
        slot[1..=tags.len()].copy_from_slice(tags.as_bytes());
        slot[tags.len() + 1..].fill(0);
        Ok(())
    }

    /// Write a precomputed tag word from [`tag_word`]
    #[inline]
    pub fn write_tag_word(&mut self, tags: [u8; 4]) -> Result<()> {
        self.put(&tags)
    }

    /// Reset, then write `address` followed by a precomputed tag word.
    ///
    /// Covers every message with two or fewer elements; see [`tag_word`].
    pub fn write_address_and_tags(&mut self, address: &str, tags: [u8; 4]) -> Result<()> {
        if !address.starts_with('/') {
            return Err(Error::MissingAddressSlash);
        }
        if !address.is_ascii() {
            return Err(Error::NonAscii);
        }
        let padded = padded_string_len(address.len());
        if padded + 4 > self.buffer.len() {
            return Err(Error::BufferTooSmall {
                needed: padded + 4,
                have: self.buffer.len(),
            });
        }

        self.length = 0;
        self.put_padded(address.as_bytes(), padded)?;
        self.put(&tags)
    }

    /// Reset, then encode a complete message carrying one [`Argument`]
    pub fn write_message<A: Argument + ?Sized>(&mut self, address: &str, value: &A) -> Result<()> {
        let tags = value.type_tags();
        let result = match pack_tag_word(tags) {
            Some(word) => self.write_address_and_tags(address, word),
            None => {
                self.reset();
                self.write_address(address)
                    .and_then(|_| self.write_tags(tags))
            }
        };
        result.and_then(|_| value.write_payload(self))
    }

    // ------------------------------------------------------------------
    // Bundles
    // ------------------------------------------------------------------

    /// Write the 8-byte `#bundle` tag
    pub fn write_bundle_prefix(&mut self) -> Result<()> {
        self.put(BUNDLE_PREFIX)
    }

    /// Write the bundle tag and its time tag
    pub fn write_bundle_header(&mut self, timestamp: NtpTimestamp) -> Result<()> {
        let slot = self.claim(16)?;
        slot[..8].copy_from_slice(BUNDLE_PREFIX);
        slot[8..].copy_from_slice(&timestamp.to_be_bytes());
        Ok(())
    }

    /// Reserve a bundle element's size field; write the element next
    pub fn begin_bundle_element(&mut self) -> Result<ElementMark> {
        let at = self.length;
        self.put(&[0; 4])?;
        Ok(ElementMark(at))
    }

    /// Fill in the size of the element started at `mark`
    pub fn end_bundle_element(&mut self, mark: ElementMark) -> Result<()> {
        let ElementMark(at) = mark;
        if at + 4 > self.length {
            return Err(Error::Truncated {
                needed: at + 4,
                have: self.length,
            });
        }
        let size = (self.length - at - 4) as u32;
        self.buffer[at..at + 4].copy_from_slice(&size.to_be_bytes());
        Ok(())
    }
}

impl Default for OscWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OscWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscWriter")
            .field("len", &self.length)
            .field("capacity", &self.buffer.len())
            .finish()
    }
}

/// A value that can be sent as the payload of a message.
///
/// `type_tags` lists the tags the value occupies, without the leading comma;
/// most values are one element, vectors are runs of floats.
pub trait Argument {
    fn type_tags(&self) -> &'static str;

    fn write_payload(&self, writer: &mut OscWriter) -> Result<()>;
}

impl<T: Argument + ?Sized> Argument for &T {
    fn type_tags(&self) -> &'static str {
        (**self).type_tags()
    }

    fn write_payload(&self, writer: &mut OscWriter) -> Result<()> {
        (**self).write_payload(writer)
    }
}

macro_rules! impl_argument {
    ($ty:ty, $tags:literal, $method:ident) => {
        impl Argument for $ty {
            #[inline]
            fn type_tags(&self) -> &'static str {
                $tags
            }

            #[inline]
            fn write_payload(&self, writer: &mut OscWriter) -> Result<()> {
                writer.$method(*self)
            }
        }
    };
}

impl_argument!(i32, "i", write_int);
impl_argument!(i64, "h", write_int64);
impl_argument!(f32, "f", write_float);
impl_argument!(f64, "d", write_float64);
impl_argument!(char, "c", write_char);
impl_argument!(Color32, "r", write_color);
impl_argument!(MidiMessage, "m", write_midi);
impl_argument!(NtpTimestamp, "t", write_timestamp);
impl_argument!(Vector2, "ff", write_vector2);
impl_argument!(Vector3, "fff", write_vector3);

impl Argument for bool {
    fn type_tags(&self) -> &'static str {
        if *self {
            "T"
        } else {
            "F"
        }
    }

    fn write_payload(&self, _writer: &mut OscWriter) -> Result<()> {
        Ok(())
    }
}

impl Argument for str {
    fn type_tags(&self) -> &'static str {
        "s"
    }

    fn write_payload(&self, writer: &mut OscWriter) -> Result<()> {
        writer.write_string(self)
    }
}

impl Argument for String {
    fn type_tags(&self) -> &'static str {
        "s"
    }

    fn write_payload(&self, writer: &mut OscWriter) -> Result<()> {
        writer.write_string(self)
    }
}

impl Argument for [u8] {
    fn type_tags(&self) -> &'static str {
        "b"
    }

    fn write_payload(&self, writer: &mut OscWriter) -> Result<()> {
        writer.write_blob(self)
    }
}

impl Argument for Vec<u8> {
    fn type_tags(&self) -> &'static str {
        "b"
    }

    fn write_payload(&self, writer: &mut OscWriter) -> Result<()> {
        writer.write_blob(self)
    }
}

/// Pack up to two tags into a tag word.
///
/// Three or more tags need a second block for the terminator, so they have
/// no single-word form.
pub fn pack_tag_word(tags: &str) -> Option<[u8; 4]> {
    match tags.as_bytes() {
        [] => Some(tag_word::EMPTY),
        [a] => Some([b',', *a, 0, 0]),
        [a, b] => Some([b',', *a, *b, 0]),
        _ => None,
    }
}
