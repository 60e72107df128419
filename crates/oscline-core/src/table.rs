//! Address dictionary keyed on raw bytes

use std::collections::HashMap;

use crate::key::{AddressEntry, BuildBlobHasher};

/// Default number of addresses a table is sized for
pub const DEFAULT_CAPACITY: usize = 16;

/// Maps OSC addresses to values, with lookups straight from datagram bytes.
///
/// Registration takes a `&str` and the table keeps its own copy of the
/// address. Lookups on the receive path use [`get_bytes`](Self::get_bytes),
/// which probes with a byte slice over the caller's memory and never
/// allocates.
#[derive(Debug, Clone)]
pub struct AddressTable<V> {
    entries: HashMap<AddressEntry, V, BuildBlobHasher>,
}

impl<V> AddressTable<V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity_and_hasher(capacity, BuildBlobHasher::default()),
        }
    }

    /// Insert a value for an address.
    ///
    /// Empty addresses and addresses already present are ignored; returns
    /// whether the value was stored.
    pub fn insert(&mut self, address: &str, value: V) -> bool {
        if address.is_empty() || self.contains(address) {
            return false;
        }
        self.entries.insert(AddressEntry::new(address), value);
        true
    }

    /// Look up a value by the raw bytes of an address
    #[inline]
    pub fn get_bytes(&self, bytes: &[u8]) -> Option<&V> {
        self.entries.get(bytes)
    }

    #[inline]
    pub fn get_bytes_mut(&mut self, bytes: &[u8]) -> Option<&mut V> {
        self.entries.get_mut(bytes)
    }

    #[inline]
    pub fn get(&self, address: &str) -> Option<&V> {
        self.get_bytes(address.as_bytes())
    }

    #[inline]
    pub fn get_mut(&mut self, address: &str) -> Option<&mut V> {
        self.get_bytes_mut(address.as_bytes())
    }

    #[inline]
    pub fn contains_bytes(&self, bytes: &[u8]) -> bool {
        self.entries.contains_key(bytes)
    }

    #[inline]
    pub fn contains(&self, address: &str) -> bool {
        self.contains_bytes(address.as_bytes())
    }

    /// Remove an address, returning its value if it was present
    pub fn remove(&mut self, address: &str) -> Option<V> {
        self.entries.remove(address.as_bytes())
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &mut V) -> bool) {
        self.entries.retain(|entry, value| keep(entry.as_str(), value));
    }

    /// Iterate over stored addresses and values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(entry, value)| (entry.as_str(), value))
    }

    /// Iterate over stored addresses
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(AddressEntry::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V> Default for AddressTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
