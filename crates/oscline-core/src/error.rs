//! Error types for the OSC wire format

use thiserror::Error;

/// Result type alias for wire format operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wire format error types
///
/// Parser variants carry no heap data so a malformed datagram can be rejected
/// on the receive thread without allocating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Address did not begin with '/'
    #[error("address must start with '/'")]
    MissingAddressSlash,

    /// A string ran off the end of the datagram without a null terminator
    #[error("unterminated {0} string")]
    Unterminated(&'static str),

    /// Datagram ended before an element's payload
    #[error("truncated datagram: need {needed} bytes, have {have}")]
    Truncated { needed: usize, have: usize },

    /// Type tag string missing or not prefixed with ','
    #[error("missing type tag string")]
    MissingTypeTags,

    /// Checked read against an element of an incompatible type
    #[error("element {index} is '{found}', cannot read as {expected}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        found: char,
    },

    /// Element index past the end of the message
    #[error("element index {index} out of range ({count} elements)")]
    IndexOutOfRange { index: usize, count: usize },

    /// Writer buffer too small
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// Strings on the wire must be ASCII
    #[error("string is not ASCII")]
    NonAscii,

    /// Invalid address format
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Address pattern compilation error
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Bundles nested past the supported depth
    #[error("bundle nesting exceeds {0} levels")]
    BundleTooDeep(usize),
}
