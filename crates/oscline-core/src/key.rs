//! Byte-range hash keys
//!
//! [`AddressEntry`] is the owned key stored in an
//! [`AddressTable`](crate::table::AddressTable). It borrows as `[u8]`, so the
//! table can be probed with a plain byte slice taken straight from the receive
//! buffer without building a `String`. Entry and slice hash identically, so a
//! probe over `b"/foo"` in a datagram finds the entry registered as `"/foo"`.
//!
//! The hash combines the length with the last byte. OSC addresses in one
//! application are usually length-diverse, which keeps collisions low while
//! hashing in O(1) regardless of address length.

use std::borrow::Borrow;
use std::hash::{BuildHasherDefault, Hash, Hasher};

/// Length-and-last-byte hash
#[inline]
pub fn blob_hash(bytes: &[u8]) -> u64 {
    combine(bytes.len() as u64, bytes.last().copied().unwrap_or(0))
}

#[inline]
fn combine(len: u64, last: u8) -> u64 {
    len.wrapping_mul(397) ^ u64::from(last)
}

/// Owned address key
#[derive(Clone, PartialEq, Eq)]
pub struct AddressEntry {
    address: Box<str>,
}

impl AddressEntry {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.into(),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.address
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.address.as_bytes()
    }
}

// Must hash exactly like `[u8]`, or borrowed lookups miss.
impl Hash for AddressEntry {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl Borrow<[u8]> for AddressEntry {
    #[inline]
    fn borrow(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for AddressEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AddressEntry").field(&self.address).finish()
    }
}

/// Hasher for byte-slice keys.
///
/// Hashing a `[u8]` feeds the slice length through `write_usize` and then the
/// bytes through a single `write`; only the length and the final byte are
/// kept. Not meant for other key types.
#[derive(Default, Clone, Copy)]
pub struct BlobHasher {
    len: u64,
    last: u8,
}

impl Hasher for BlobHasher {
    #[inline]
    fn finish(&self) -> u64 {
        // Fibonacci multiply so the table's high control bits see entropy
        combine(self.len, self.last).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        if let Some(&last) = bytes.last() {
            self.last = last;
        }
    }

    #[inline]
    fn write_usize(&mut self, len: usize) {
        self.len = len as u64;
    }
}

/// `BuildHasher` for maps keyed by [`AddressEntry`]
pub type BuildBlobHasher = BuildHasherDefault<BlobHasher>;
