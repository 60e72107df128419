//! Deferred callback queue
//!
//! The receive thread pushes follow-up callbacks here; the host drains them
//! on whatever thread it designates, once per tick. Callbacks pushed while a
//! drain is running wait for the next drain.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::handler::DeferredFn;

/// FIFO of deferred callbacks
#[derive(Default)]
pub struct DeferredQueue {
    queue: Mutex<VecDeque<Arc<DeferredFn>>>,
    draining: AtomicBool,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, callback: Arc<DeferredFn>) {
        self.queue.lock().push_back(callback);
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Run everything queued so far, oldest first, and return how many ran.
    ///
    /// A nested call from inside a callback returns 0 without running
    /// anything.
    pub fn drain(&self) -> usize {
        if self.draining.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let _guard = DrainGuard(&self.draining);

        // lock released before any callback runs, so callbacks may push
        let batch = std::mem::take(&mut *self.queue.lock());
        let count = batch.len();
        for callback in batch {
            callback();
        }
        count
    }
}

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.len())
            .finish()
    }
}

/// Clears the draining flag even if a callback panics
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_fifo() {
        let queue = DeferredQueue::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            queue.push(Arc::new(move || order.lock().push(i)));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_during_drain_waits_for_next() {
        let queue = Arc::new(DeferredQueue::new());
        let ran = Arc::new(Mutex::new(Vec::new()));

        let inner_queue = Arc::clone(&queue);
        let inner_ran = Arc::clone(&ran);
        queue.push(Arc::new(move || {
            inner_ran.lock().push("outer");
            let ran = Arc::clone(&inner_ran);
            inner_queue.push(Arc::new(move || ran.lock().push("inner")));
        }));

        assert_eq!(queue.drain(), 1);
        assert_eq!(*ran.lock(), vec!["outer"]);
        assert_eq!(queue.drain(), 1);
        assert_eq!(*ran.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_nested_drain_is_noop() {
        let queue = Arc::new(DeferredQueue::new());
        let nested = Arc::new(Mutex::new(None));

        let q = Arc::clone(&queue);
        let n = Arc::clone(&nested);
        queue.push(Arc::new(move || {
            *n.lock() = Some(q.drain());
        }));

        assert_eq!(queue.drain(), 1);
        assert_eq!(*nested.lock(), Some(0));
    }
}
