//! Message handlers
//!
//! A [`HandlerPair`] is what gets registered at an address: a read callback
//! that runs on the receive thread while the datagram is still borrowed, and
//! an optional deferred callback queued for the host's next
//! [`drain`](crate::DeferredQueue::drain).
//!
//! Pairs are compared by identity. Cloning a pair yields a handle to the same
//! callbacks, which is what [`HandlerSet::remove`] matches against.

use std::sync::Arc;

use oscline_core::MessageValues;

use crate::deferred::DeferredQueue;

/// Read callback signature
pub type ReadFn = dyn Fn(&MessageValues<'_>) + Send + Sync;

/// Deferred callback signature
pub type DeferredFn = dyn Fn() + Send + Sync;

/// Read callback plus optional deferred follow-up
#[derive(Clone)]
pub struct HandlerPair {
    read: Arc<ReadFn>,
    deferred: Option<Arc<DeferredFn>>,
}

impl HandlerPair {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn(&MessageValues<'_>) + Send + Sync + 'static,
    {
        Self {
            read: Arc::new(read),
            deferred: None,
        }
    }

    pub fn with_deferred<F, D>(read: F, deferred: D) -> Self
    where
        F: Fn(&MessageValues<'_>) + Send + Sync + 'static,
        D: Fn() + Send + Sync + 'static,
    {
        Self {
            read: Arc::new(read),
            deferred: Some(Arc::new(deferred)),
        }
    }

    /// Run the read callback
    #[inline]
    pub fn read(&self, values: &MessageValues<'_>) {
        (self.read)(values)
    }

    pub fn deferred(&self) -> Option<&Arc<DeferredFn>> {
        self.deferred.as_ref()
    }

    /// Run the read callback, then queue the deferred follow-up if any
    pub fn invoke(&self, values: &MessageValues<'_>, deferred: &DeferredQueue) {
        self.read(values);
        if let Some(callback) = &self.deferred {
            deferred.push(Arc::clone(callback));
        }
    }

    /// Whether both handles refer to the same callbacks
    pub fn same_as(&self, other: &HandlerPair) -> bool {
        // compare data pointers only; vtable pointers may differ across codegen units
        std::ptr::eq(
            Arc::as_ptr(&self.read) as *const (),
            Arc::as_ptr(&other.read) as *const (),
        )
    }
}

impl std::fmt::Debug for HandlerPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerPair")
            .field("read", &Arc::as_ptr(&self.read))
            .field("deferred", &self.deferred.is_some())
            .finish()
    }
}

/// Ordered handlers for one address or pattern
#[derive(Debug, Clone, Default)]
pub struct HandlerSet {
    pairs: Vec<HandlerPair>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(pair: HandlerPair) -> Self {
        Self { pairs: vec![pair] }
    }

    pub fn push(&mut self, pair: HandlerPair) {
        self.pairs.push(pair);
    }

    /// Append every handler of `other`, keeping order
    pub fn extend_from(&mut self, other: &HandlerSet) {
        self.pairs.extend(other.pairs.iter().cloned());
    }

    /// Remove the first handler that is `pair`; the rest stay in order
    pub fn remove(&mut self, pair: &HandlerPair) -> bool {
        match self.pairs.iter().position(|p| p.same_as(pair)) {
            Some(index) => {
                self.pairs.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerPair> {
        self.pairs.iter()
    }
}
