//! Datagram dispatch
//!
//! Turns one received datagram into handler calls. A plain message is parsed
//! and routed through the [`AddressSpace`]; a bundle is walked element by
//! element, recursing into nested bundles:
//!
//! ```text
//! #bundle  time  [size][ /a ,i 1 ]  [size][ #bundle time [size][ /b ... ] ]
//!                 └── message ──┘         └──────── nested bundle ───────┘
//! ```
//!
//! Every element is confined to its declared size, so a malformed element is
//! dropped on its own and parsing resumes at the next sibling. A declared size
//! running past the enclosing bundle ends that bundle.

use std::sync::Arc;

use oscline_core::parser::BUNDLE_HEADER_SIZE;
use oscline_core::{is_bundle_at, read_u32_at, OscParser, MAX_BUNDLE_DEPTH};
use parking_lot::Mutex;
use tracing::trace;

use crate::deferred::DeferredQueue;
use crate::handler::HandlerPair;
use crate::monitor::Monitors;
use crate::space::AddressSpace;

/// Parses datagrams and routes their messages
///
/// Owns the parser scratch state, so one dispatcher serves one receive loop.
/// The address space is locked only while a message's handlers are resolved.
/// Callbacks run after the lock is released, so they may register or remove
/// handlers on the same server.
pub struct Dispatcher {
    parser: OscParser,
    matched: Vec<HandlerPair>,
    space: Arc<Mutex<AddressSpace>>,
    deferred: Arc<DeferredQueue>,
    monitors: Arc<Monitors>,
}

impl Dispatcher {
    pub fn new(
        space: Arc<Mutex<AddressSpace>>,
        deferred: Arc<DeferredQueue>,
        monitors: Arc<Monitors>,
    ) -> Self {
        Self {
            parser: OscParser::new(),
            matched: Vec::new(),
            space,
            deferred,
            monitors,
        }
    }

    /// A dispatcher over a fresh, empty address space
    pub fn detached() -> Self {
        Self::new(
            Arc::new(Mutex::new(AddressSpace::new())),
            Arc::new(DeferredQueue::new()),
            Arc::new(Monitors::new()),
        )
    }

    pub fn space(&self) -> &Arc<Mutex<AddressSpace>> {
        &self.space
    }

    pub fn deferred(&self) -> &Arc<DeferredQueue> {
        &self.deferred
    }

    pub fn monitors(&self) -> &Arc<Monitors> {
        &self.monitors
    }

    /// Dispatch one datagram, returning how many messages in it parsed
    pub fn dispatch(&mut self, datagram: &[u8]) -> usize {
        if is_bundle_at(datagram, 0) {
            self.dispatch_bundle(datagram, 0, 1)
        } else {
            usize::from(self.dispatch_message(datagram, 0))
        }
    }

    /// Walk the bundle occupying `buffer[start..]`
    fn dispatch_bundle(&mut self, buffer: &[u8], start: usize, depth: usize) -> usize {
        if depth > MAX_BUNDLE_DEPTH {
            trace!("dropping bundle nested {} levels deep", depth);
            return 0;
        }

        let end = buffer.len();
        let mut offset = start + BUNDLE_HEADER_SIZE;
        let mut parsed = 0;

        while offset + 4 <= end {
            let Ok(size) = read_u32_at(buffer, offset) else {
                break;
            };
            let content = offset + 4;
            let content_end = match content.checked_add(size as usize) {
                Some(content_end) if content_end <= end => content_end,
                _ => {
                    trace!(
                        "bundle element at {} declares {} bytes, past end {}",
                        offset,
                        size,
                        end
                    );
                    break;
                }
            };

            let element = &buffer[..content_end];
            if is_bundle_at(element, content) {
                parsed += self.dispatch_bundle(element, content, depth + 1);
            } else if self.dispatch_message(element, content) {
                parsed += 1;
            }
            offset = content_end;
        }
        parsed
    }

    /// Parse and route the message at `start`; `buffer` ends where it does
    fn dispatch_message(&mut self, buffer: &[u8], start: usize) -> bool {
        if let Err(e) = self.parser.parse(buffer, start) {
            trace!("dropping malformed message at {}: {}", start, e);
            return false;
        }

        let address = self.parser.address_bytes(buffer);
        let values = self.parser.values(buffer);
        let matched = self.space.lock().resolve(address, &mut self.matched);
        for pair in &self.matched {
            pair.invoke(&values, &self.deferred);
        }
        self.matched.clear();

        if !matched {
            trace!(
                "no handler for {}",
                String::from_utf8_lossy(address)
            );
        }

        if !self.monitors.is_empty() {
            if let Ok(address) = std::str::from_utf8(address) {
                self.monitors.notify(address, &values);
            }
        }
        true
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("deferred", &self.deferred)
            .field("monitors", &self.monitors)
            .finish()
    }
}
