//! Common test helpers for oscline tests
//!
//! This crate provides:
//! - Free UDP port lookup
//! - Condition-based waiting (no hardcoded sleeps)
//! - Collectors for values seen by handler callbacks
//! - Raw datagram and message builders

use oscline_core::{Argument, OscWriter};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default test timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default condition check interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(5);

// ============================================================================
// Port Allocation
// ============================================================================

/// Find an available UDP port for testing
pub fn find_available_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}

// ============================================================================
// Condition-Based Waiting
// ============================================================================

/// Poll `check` until it holds or `max_wait` elapses
pub fn wait_for<F>(check: F, interval: Duration, max_wait: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < max_wait {
        if check() {
            return true;
        }
        std::thread::sleep(interval);
    }
    check()
}

/// Wait for an atomic counter to reach a target value
pub fn wait_for_count(counter: &AtomicU32, target: u32, max_wait: Duration) -> bool {
    wait_for(
        || counter.load(Ordering::SeqCst) >= target,
        DEFAULT_CHECK_INTERVAL,
        max_wait,
    )
}

// ============================================================================
// Datagrams
// ============================================================================

/// Encode a single-value message
pub fn message<A: Argument>(address: &str, value: A) -> Vec<u8> {
    let mut writer = OscWriter::new();
    writer.write_message(address, &value).unwrap();
    writer.as_bytes().to_vec()
}

/// Wrap encoded elements in a bundle with an immediate time tag.
///
/// Sizes are taken from the element lengths as given, so callers can pass
/// deliberately malformed elements.
pub fn bundle(elements: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + elements.iter().map(|e| e.len() + 4).sum::<usize>());
    out.extend_from_slice(b"#bundle\0");
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 1]);
    for element in elements {
        out.extend_from_slice(&(element.len() as u32).to_be_bytes());
        out.extend_from_slice(element);
    }
    out
}

/// Send raw bytes to a local port
pub fn send_datagram(port: u16, bytes: &[u8]) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.send_to(bytes, ("127.0.0.1", port)).unwrap();
}

// ============================================================================
// Collectors - for verifying values seen by callbacks
// ============================================================================

/// Thread-safe record of values pushed from callbacks
#[derive(Clone)]
pub struct Collector<T> {
    values: Arc<parking_lot::Mutex<Vec<T>>>,
    count: Arc<AtomicU32>,
}

impl<T: Clone + Send + 'static> Collector<T> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(parking_lot::Mutex::new(Vec::new())),
            count: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn push(&self, value: T) {
        self.values.lock().push(value);
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Get the count of received values
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Wait for at least n values to be received
    pub fn wait_for_count(&self, n: u32, max_wait: Duration) -> bool {
        wait_for_count(&self.count, n, max_wait)
    }

    /// Get all collected values
    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    pub fn last(&self) -> Option<T> {
        self.values.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.values.lock().clear();
        self.count.store(0, Ordering::SeqCst);
    }
}

impl<T: Clone + Send + 'static> Default for Collector<T> {
    fn default() -> Self {
        Self::new()
    }
}
