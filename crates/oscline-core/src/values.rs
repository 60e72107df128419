//! Typed element readers
//!
//! [`MessageValues`] is a borrowed view over one parsed message: the datagram
//! bytes plus the parser's tag/offset index. It lives only as long as the
//! receive buffer is lent out, so handlers cannot keep it past their return.
//!
//! Every reader has a checked form that validates the element's tag and
//! returns [`Error::TypeMismatch`] on an incompatible one, and an unchecked
//! form that skips the tag test for callers that already know the layout.
//! Both decode the same bytes. Reading past [`element_count`] panics; debug
//! builds report the index and count first.
//!
//! Coercions accepted by the checked readers:
//!
//! | Reader          | Accepts                                    |
//! |-----------------|--------------------------------------------|
//! | `read_int`      | `i`, `f` (truncated)                       |
//! | `read_int64`    | `h`, `i` (widened), `d` `f` (truncated)    |
//! | `read_float`    | `f`, `i` (wire bits reinterpreted)         |
//! | `read_float64`  | `d`, `f` `h` `i` (widened)                 |
//! | `read_bool`     | `T`, `F`, `i` (`> 0`)                      |
//! | `read_string`   | `s` `S`, and any tag with a text form      |
//!
//! [`element_count`]: MessageValues::element_count

use crate::tags::TypeTag;
use crate::types::{Color32, MidiMessage, NtpTimestamp};
use crate::{Error, Result};

/// Extra bytes reserved when a caller's blob buffer has to grow
pub const RESIZE_BYTE_HEADROOM: usize = 1024;

/// Typed view over one parsed message
#[derive(Debug, Clone, Copy)]
pub struct MessageValues<'a> {
    buffer: &'a [u8],
    tags: &'a [u8],
    offsets: &'a [usize],
}

impl<'a> MessageValues<'a> {
    pub(crate) fn new(buffer: &'a [u8], tags: &'a [u8], offsets: &'a [usize]) -> Self {
        debug_assert_eq!(tags.len(), offsets.len());
        Self {
            buffer,
            tags,
            offsets,
        }
    }

    /// Number of elements in the message
    #[inline]
    pub fn element_count(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The element's tag, or `None` for a tag this crate doesn't know
    #[inline]
    pub fn tag(&self, index: usize) -> Option<TypeTag> {
        TypeTag::from_byte(self.raw_tag(index))
    }

    /// The element's tag byte as it appeared on the wire
    #[inline]
    pub fn raw_tag(&self, index: usize) -> u8 {
        self.debug_check(index);
        self.tags[index]
    }

    /// All tag bytes in element order
    pub fn tags(&self) -> impl Iterator<Item = u8> + 'a {
        self.tags.iter().copied()
    }

    /// Run `f` for every element with its index and raw tag
    pub fn for_each_element(&self, mut f: impl FnMut(usize, u8)) {
        for (index, &tag) in self.tags.iter().enumerate() {
            f(index, tag);
        }
    }

    #[inline]
    fn debug_check(&self, index: usize) {
        debug_assert!(
            index < self.tags.len(),
            "tried to read message element index {}, but there are only {} elements",
            index,
            self.tags.len()
        );
    }

    #[inline]
    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.tags.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count: self.tags.len(),
            });
        }
        Ok(())
    }

    #[inline]
    fn mismatch(&self, index: usize, expected: &'static str) -> Error {
        Error::TypeMismatch {
            index,
            expected,
            found: self.tags[index] as char,
        }
    }

    #[inline]
    fn offset(&self, index: usize) -> usize {
        self.debug_check(index);
        self.offsets[index]
    }

    #[inline]
    fn bytes4(&self, index: usize) -> [u8; 4] {
        let at = self.offset(index);
        let b = &self.buffer[at..at + 4];
        [b[0], b[1], b[2], b[3]]
    }

    #[inline]
    fn bytes8(&self, index: usize) -> [u8; 8] {
        let at = self.offset(index);
        let mut out = [0u8; 8];
        out.copy_from_slice(&self.buffer[at..at + 8]);
        out
    }

    // ------------------------------------------------------------------
    // 32-bit integers
    // ------------------------------------------------------------------

    /// Read a 32-bit integer element
    pub fn read_int(&self, index: usize) -> Result<i32> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::Int32) => Ok(self.read_int_unchecked(index)),
            Some(TypeTag::Float32) => Ok(self.read_float_unchecked(index) as i32),
            _ => Err(self.mismatch(index, "int32")),
        }
    }

    /// Read a 32-bit integer element without checking its tag
    #[inline]
    pub fn read_int_unchecked(&self, index: usize) -> i32 {
        i32::from_be_bytes(self.bytes4(index))
    }

    // ------------------------------------------------------------------
    // 64-bit integers
    // ------------------------------------------------------------------

    /// Read a 64-bit integer element
    pub fn read_int64(&self, index: usize) -> Result<i64> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::Int64) => Ok(self.read_int64_unchecked(index)),
            Some(TypeTag::Int32) => Ok(i64::from(self.read_int_unchecked(index))),
            Some(TypeTag::Float64) => Ok(self.read_float64_unchecked(index) as i64),
            Some(TypeTag::Float32) => Ok(self.read_float_unchecked(index) as i64),
            _ => Err(self.mismatch(index, "int64")),
        }
    }

    #[inline]
    pub fn read_int64_unchecked(&self, index: usize) -> i64 {
        i64::from_be_bytes(self.bytes8(index))
    }

    // ------------------------------------------------------------------
    // 32-bit floats
    // ------------------------------------------------------------------

    /// Read a 32-bit float element.
    ///
    /// An `i` element is reinterpreted from its wire bits, not converted.
    pub fn read_float(&self, index: usize) -> Result<f32> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::Float32) | Some(TypeTag::Int32) => Ok(self.read_float_unchecked(index)),
            _ => Err(self.mismatch(index, "float32")),
        }
    }

    #[inline]
    pub fn read_float_unchecked(&self, index: usize) -> f32 {
        f32::from_bits(u32::from_be_bytes(self.bytes4(index)))
    }

    // ------------------------------------------------------------------
    // 64-bit floats
    // ------------------------------------------------------------------

    /// Read a 64-bit float element
    pub fn read_float64(&self, index: usize) -> Result<f64> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::Float64) => Ok(self.read_float64_unchecked(index)),
            Some(TypeTag::Float32) => Ok(f64::from(self.read_float_unchecked(index))),
            Some(TypeTag::Int64) => Ok(self.read_int64_unchecked(index) as f64),
            Some(TypeTag::Int32) => Ok(f64::from(self.read_int_unchecked(index))),
            _ => Err(self.mismatch(index, "float64")),
        }
    }

    #[inline]
    pub fn read_float64_unchecked(&self, index: usize) -> f64 {
        f64::from_bits(u64::from_be_bytes(self.bytes8(index)))
    }

    // ------------------------------------------------------------------
    // Booleans
    // ------------------------------------------------------------------

    /// Read a boolean from a `T`/`F` tag or an int32 (`> 0` is true)
    pub fn read_bool(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::True) => Ok(true),
            Some(TypeTag::False) => Ok(false),
            Some(TypeTag::Int32) => Ok(self.read_int_unchecked(index) > 0),
            _ => Err(self.mismatch(index, "bool")),
        }
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Raw bytes of a string element, up to (not including) its terminator
    #[inline]
    fn string_bytes(&self, index: usize) -> &'a [u8] {
        let at = self.offset(index);
        let tail = &self.buffer[at..];
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        &tail[..len]
    }

    /// Borrow a string element without copying.
    ///
    /// Only `s` and `S` elements qualify. Non-ASCII bytes fail with
    /// [`Error::NonAscii`].
    pub fn read_str(&self, index: usize) -> Result<&'a str> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::String) | Some(TypeTag::AltString) => {
                let bytes = self.string_bytes(index);
                if !bytes.is_ascii() {
                    return Err(Error::NonAscii);
                }
                std::str::from_utf8(bytes).map_err(|_| Error::NonAscii)
            }
            _ => Err(self.mismatch(index, "string")),
        }
    }

    /// Read any element with a text form as a string.
    ///
    /// Strings are returned as-is, numbers are formatted, `T F N I` become
    /// `True False Nil Infinitum`, and colors, MIDI messages, time tags and
    /// characters use their display form. Blobs and array markers fail.
    pub fn read_string(&self, index: usize) -> Result<String> {
        self.check_index(index)?;
        let text = match self.tag(index) {
            Some(TypeTag::String) | Some(TypeTag::AltString) => {
                String::from_utf8_lossy(self.string_bytes(index)).into_owned()
            }
            Some(TypeTag::Float64) => self.read_float64_unchecked(index).to_string(),
            Some(TypeTag::Float32) => self.read_float_unchecked(index).to_string(),
            Some(TypeTag::Int64) => self.read_int64_unchecked(index).to_string(),
            Some(TypeTag::Int32) => self.read_int_unchecked(index).to_string(),
            Some(TypeTag::False) => "False".to_string(),
            Some(TypeTag::True) => "True".to_string(),
            Some(TypeTag::Nil) => "Nil".to_string(),
            Some(TypeTag::Infinitum) => "Infinitum".to_string(),
            Some(TypeTag::Color32) => self.read_color_unchecked(index).to_string(),
            Some(TypeTag::Midi) => self.read_midi_unchecked(index).to_string(),
            Some(TypeTag::TimeTag) => self.read_timestamp_unchecked(index).to_string(),
            Some(TypeTag::AsciiChar) => self.read_ascii_char_unchecked(index).to_string(),
            _ => return Err(self.mismatch(index, "string")),
        };
        Ok(text)
    }

    /// Append a string element's bytes to `out`, returning how many were copied
    pub fn read_string_bytes_into(&self, index: usize, out: &mut Vec<u8>) -> Result<usize> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::String) | Some(TypeTag::AltString) => {
                let bytes = self.string_bytes(index);
                out.extend_from_slice(bytes);
                Ok(bytes.len())
            }
            _ => Err(self.mismatch(index, "string")),
        }
    }

    // ------------------------------------------------------------------
    // Blobs
    // ------------------------------------------------------------------

    /// Borrow a blob element's contents without copying
    pub fn blob_slice(&self, index: usize) -> Result<&'a [u8]> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::Blob) => {
                let at = self.offset(index);
                let size = u32::from_be_bytes(self.bytes4(index)) as usize;
                Ok(&self.buffer[at + 4..at + 4 + size])
            }
            _ => Err(self.mismatch(index, "blob")),
        }
    }

    /// Copy a blob element into a new vector
    pub fn read_blob(&self, index: usize) -> Result<Vec<u8>> {
        self.blob_slice(index).map(<[u8]>::to_vec)
    }

    /// Copy a blob element into `dest` starting at `dest_offset`.
    ///
    /// `dest` grows (with [`RESIZE_BYTE_HEADROOM`] spare bytes) when it is too
    /// small. Returns the blob size.
    pub fn read_blob_into(&self, index: usize, dest: &mut Vec<u8>, dest_offset: usize) -> Result<usize> {
        let blob = self.blob_slice(index)?;
        let needed = dest_offset + blob.len();
        if dest.len() < needed {
            dest.resize(needed + RESIZE_BYTE_HEADROOM, 0);
        }
        dest[dest_offset..needed].copy_from_slice(blob);
        Ok(blob.len())
    }

    // ------------------------------------------------------------------
    // ASCII characters
    // ------------------------------------------------------------------

    /// Read a `c` element; the character sits in the last byte of its slot
    pub fn read_ascii_char(&self, index: usize) -> Result<char> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::AsciiChar) => Ok(self.read_ascii_char_unchecked(index)),
            _ => Err(self.mismatch(index, "ascii char")),
        }
    }

    #[inline]
    pub fn read_ascii_char_unchecked(&self, index: usize) -> char {
        char::from(self.bytes4(index)[3])
    }

    // ------------------------------------------------------------------
    // Colors
    // ------------------------------------------------------------------

    /// Read an `r` element
    pub fn read_color(&self, index: usize) -> Result<Color32> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::Color32) => Ok(self.read_color_unchecked(index)),
            _ => Err(self.mismatch(index, "color32")),
        }
    }

    #[inline]
    pub fn read_color_unchecked(&self, index: usize) -> Color32 {
        Color32::from_be_bytes(self.bytes4(index))
    }

    // ------------------------------------------------------------------
    // MIDI
    // ------------------------------------------------------------------

    /// Read an `m` element
    pub fn read_midi(&self, index: usize) -> Result<MidiMessage> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::Midi) => Ok(self.read_midi_unchecked(index)),
            _ => Err(self.mismatch(index, "midi")),
        }
    }

    #[inline]
    pub fn read_midi_unchecked(&self, index: usize) -> MidiMessage {
        MidiMessage::from_be_bytes(self.bytes4(index))
    }

    // ------------------------------------------------------------------
    // Time tags
    // ------------------------------------------------------------------

    /// Read a `t` element
    pub fn read_timestamp(&self, index: usize) -> Result<NtpTimestamp> {
        self.check_index(index)?;
        match self.tag(index) {
            Some(TypeTag::TimeTag) => Ok(self.read_timestamp_unchecked(index)),
            _ => Err(self.mismatch(index, "timetag")),
        }
    }

    #[inline]
    pub fn read_timestamp_unchecked(&self, index: usize) -> NtpTimestamp {
        NtpTimestamp::from_be_bytes(self.bytes8(index))
    }
}
