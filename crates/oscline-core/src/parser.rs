//! Message parser
//!
//! Scans one OSC message in place and records, per element, its type tag and
//! the absolute offset of its payload in the datagram. Nothing is copied: the
//! resulting [`MessageValues`] view reads straight from the datagram bytes.
//!
//! Message layout:
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Address    "/synth/1/freq\0" padded to 4     │
//! │ Type tags  ",f\0" padded to 4                │
//! │ Payloads   one per tag, each 4-byte aligned  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Bundle layout:
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ "#bundle\0"                         8 bytes  │
//! │ NTP time tag                        8 bytes  │
//! │ repeated: size (u32 BE) + element   4 + size │
//! └──────────────────────────────────────────────┘
//! ```

use crate::tags::TypeTag;
use crate::types::NtpTimestamp;
use crate::values::MessageValues;
use crate::{Error, Result};

/// The 8-byte tag opening every bundle
pub const BUNDLE_PREFIX: &[u8; 8] = b"#bundle\0";

/// Bytes before the first bundle element: prefix + time tag
pub const BUNDLE_HEADER_SIZE: usize = 16;

/// Default number of elements the parser is sized for
pub const DEFAULT_ELEMENT_CAPACITY: usize = 8;

/// Round a length up to the next multiple of 4
#[inline]
pub const fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// Check whether the bytes at `offset` open a bundle
#[inline]
pub fn is_bundle_at(buffer: &[u8], offset: usize) -> bool {
    buffer
        .get(offset..offset + BUNDLE_PREFIX.len())
        .is_some_and(|prefix| prefix == BUNDLE_PREFIX)
}

/// Check whether a datagram is a bundle
#[inline]
pub fn is_bundle(buffer: &[u8]) -> bool {
    is_bundle_at(buffer, 0)
}

/// Read a big-endian u32 at an absolute offset
#[inline]
pub fn read_u32_at(buffer: &[u8], offset: usize) -> Result<u32> {
    let bytes = buffer.get(offset..offset + 4).ok_or(Error::Truncated {
        needed: offset + 4,
        have: buffer.len(),
    })?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read the time tag of the bundle starting at `offset`
pub fn bundle_timestamp(buffer: &[u8], offset: usize) -> Result<NtpTimestamp> {
    let start = offset + BUNDLE_PREFIX.len();
    let bytes = buffer.get(start..start + 8).ok_or(Error::Truncated {
        needed: start + 8,
        have: buffer.len(),
    })?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(NtpTimestamp::from_be_bytes(raw))
}

/// Find the null terminator at or after `start`
#[inline]
fn find_null(buffer: &[u8], start: usize) -> Option<usize> {
    buffer
        .get(start..)?
        .iter()
        .position(|&b| b == 0)
        .map(|pos| start + pos)
}

/// Reusable message parser
///
/// Holds the tag and offset index for the most recently parsed message.
/// Capacity is retained between messages, so after warm-up parsing does not
/// allocate. Only the first [`element_count`](Self::element_count) slots are
/// meaningful.
#[derive(Debug, Clone)]
pub struct OscParser {
    tags: Vec<u8>,
    offsets: Vec<usize>,
    address_start: usize,
    address_len: usize,
}

impl OscParser {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ELEMENT_CAPACITY)
    }

    pub fn with_capacity(elements: usize) -> Self {
        Self {
            tags: Vec::with_capacity(elements),
            offsets: Vec::with_capacity(elements),
            address_start: 0,
            address_len: 0,
        }
    }

    /// Parse the message starting at `start`.
    ///
    /// Returns the address length in bytes, excluding the null terminator and
    /// padding, so the address can be looked up by its content bytes alone.
    /// Every element's payload is checked to lie within `buffer`, so typed
    /// reads on the resulting view cannot run past the datagram.
    pub fn parse(&mut self, buffer: &[u8], start: usize) -> Result<usize> {
        self.tags.clear();
        self.offsets.clear();
        self.address_start = start;
        self.address_len = 0;

        if buffer.get(start) != Some(&b'/') {
            return Err(Error::MissingAddressSlash);
        }

        let address_end = find_null(buffer, start).ok_or(Error::Unterminated("address"))?;
        let address_len = address_end - start;

        let tags_start = start + align4(address_len + 1);
        if tags_start >= buffer.len() {
            // Pre-1.0 senders may omit the tag string entirely
            self.address_len = address_len;
            return Ok(address_len);
        }
        if buffer[tags_start] != b',' {
            return Err(Error::MissingTypeTags);
        }

        let tags_end = find_null(buffer, tags_start).ok_or(Error::Unterminated("type tag"))?;
        let mut offset = tags_start + align4(tags_end - tags_start + 1);

        for &tag in &buffer[tags_start + 1..tags_end] {
            let size = element_size(buffer, tag, offset)?;
            if offset + size > buffer.len() {
                return Err(Error::Truncated {
                    needed: offset + size,
                    have: buffer.len(),
                });
            }
            self.tags.push(tag);
            self.offsets.push(offset);
            offset += size;
        }

        self.address_len = address_len;
        Ok(address_len)
    }

    /// Number of elements in the last parsed message
    #[inline]
    pub fn element_count(&self) -> usize {
        self.tags.len()
    }

    /// Address bytes of the last parsed message
    #[inline]
    pub fn address_bytes<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.address_start..self.address_start + self.address_len]
    }

    /// Borrow the last parsed message as a typed view over `buffer`.
    ///
    /// `buffer` must be the same bytes that were passed to [`parse`](Self::parse).
    #[inline]
    pub fn values<'a>(&'a self, buffer: &'a [u8]) -> MessageValues<'a> {
        MessageValues::new(buffer, &self.tags, &self.offsets)
    }
}

impl Default for OscParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload size of one element whose data begins at `offset`
fn element_size(buffer: &[u8], tag: u8, offset: usize) -> Result<usize> {
    let Some(tag) = TypeTag::from_byte(tag) else {
        // Unknown tags are kept opaque and carry no payload
        return Ok(0);
    };

    if let Some(size) = tag.fixed_size() {
        return Ok(size);
    }

    match tag {
        TypeTag::String | TypeTag::AltString => {
            let end = find_null(buffer, offset).ok_or(Error::Unterminated("string"))?;
            Ok(align4(end - offset + 1))
        }
        TypeTag::Blob => {
            let len = read_u32_at(buffer, offset)? as usize;
            Ok(4 + align4(len))
        }
        _ => Ok(0),
    }
}
