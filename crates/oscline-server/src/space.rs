//! Address space
//!
//! Maps incoming addresses to handlers in two tiers:
//!
//! ```text
//!   address bytes ──► exact table ──hit──► handlers
//!                          │
//!                         miss
//!                          ▼
//!                    pattern slots (in slot order) ──match──► handlers
//!                          │
//!                          └── union of matches cached in the exact table
//! ```
//!
//! Exact lookups probe the table straight from the datagram bytes. Patterns
//! are only tested on a miss, and the first address that matches any of them
//! is cached so the same address never scans patterns twice.
//!
//! Cached entries are tagged and never mix with registered ones: an exact
//! registration replaces a cached entry for the same address, and any pattern
//! change drops the whole cache. The cache holds at most
//! [`DEFAULT_CACHE_LIMIT`] addresses unless reconfigured; addresses past the
//! limit are matched against the patterns on every message.

use std::collections::{HashMap, VecDeque};

use oscline_core::{classify, AddressKind, AddressTable, Pattern};
use tracing::{debug, trace};

use crate::error::{Result, ServerError};
use crate::handler::{HandlerPair, HandlerSet};

/// Pattern slots allocated up front
pub const DEFAULT_PATTERN_CAPACITY: usize = 8;

/// Pattern-matched addresses cached before caching stops
pub const DEFAULT_CACHE_LIMIT: usize = 1024;

/// Where an exact-table entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOrigin {
    /// Registered for this address
    Registered,
    /// Union of pattern handlers that matched this address
    PatternCache,
}

#[derive(Debug)]
struct Route {
    handlers: HandlerSet,
    origin: RouteOrigin,
}

#[derive(Debug)]
struct PatternSlot {
    pattern: Pattern,
    handlers: HandlerSet,
}

/// Handler registrations for one server
#[derive(Debug)]
pub struct AddressSpace {
    routes: AddressTable<Route>,
    patterns: Vec<Option<PatternSlot>>,
    free_slots: VecDeque<usize>,
    pattern_index: HashMap<String, usize>,
    pattern_count: usize,
    pattern_tests: u64,
    cached_routes: usize,
    cache_limit: usize,
}

impl AddressSpace {
    pub fn new() -> Self {
        Self::with_capacity(oscline_core::table::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            routes: AddressTable::with_capacity(capacity),
            patterns: Vec::with_capacity(DEFAULT_PATTERN_CAPACITY),
            free_slots: VecDeque::new(),
            pattern_index: HashMap::new(),
            pattern_count: 0,
            pattern_tests: 0,
            cached_routes: 0,
            cache_limit: DEFAULT_CACHE_LIMIT,
        }
    }

    /// Register a handler at an exact address or a pattern.
    ///
    /// Registering the same address or pattern again adds to its handlers.
    pub fn add(&mut self, address: &str, pair: HandlerPair) -> Result<()> {
        match classify(address) {
            AddressKind::Exact => {
                self.add_exact(address, pair);
                Ok(())
            }
            AddressKind::Pattern => self.add_pattern(address, pair),
            AddressKind::Invalid => Err(ServerError::InvalidAddress(address.to_string())),
        }
    }

    fn add_exact(&mut self, address: &str, pair: HandlerPair) {
        match self.routes.get_mut(address) {
            Some(route) if route.origin == RouteOrigin::Registered => {
                route.handlers.push(pair);
            }
            Some(route) => {
                debug!("exact registration replaces cached pattern route for {}", address);
                route.handlers = HandlerSet::single(pair);
                route.origin = RouteOrigin::Registered;
                self.cached_routes -= 1;
            }
            None => {
                self.routes.insert(
                    address,
                    Route {
                        handlers: HandlerSet::single(pair),
                        origin: RouteOrigin::Registered,
                    },
                );
            }
        }
        debug!("registered handler for {}", address);
    }

    fn add_pattern(&mut self, pattern: &str, pair: HandlerPair) -> Result<()> {
        if let Some(&index) = self.pattern_index.get(pattern) {
            if let Some(slot) = self.patterns[index].as_mut() {
                slot.handlers.push(pair);
            }
        } else {
            let slot = PatternSlot {
                pattern: Pattern::compile(pattern)?,
                handlers: HandlerSet::single(pair),
            };
            let index = match self.free_slots.pop_front() {
                Some(index) => {
                    self.patterns[index] = Some(slot);
                    index
                }
                None => {
                    self.patterns.push(Some(slot));
                    self.patterns.len() - 1
                }
            };
            self.pattern_index.insert(pattern.to_string(), index);
            self.pattern_count += 1;
            debug!("registered pattern {} in slot {}", pattern, index);
        }

        self.purge_cache();
        Ok(())
    }

    /// Remove one handler from an address or pattern.
    ///
    /// Only the first registration of `pair` is removed. An address or
    /// pattern left without handlers is removed entirely.
    pub fn remove(&mut self, address: &str, pair: &HandlerPair) -> bool {
        match classify(address) {
            AddressKind::Exact => {
                let Some(route) = self.routes.get_mut(address) else {
                    return false;
                };
                if route.origin != RouteOrigin::Registered || !route.handlers.remove(pair) {
                    return false;
                }
                if route.handlers.is_empty() {
                    self.routes.remove(address);
                }
                debug!("removed handler for {}", address);
                true
            }
            AddressKind::Pattern => {
                let Some(&index) = self.pattern_index.get(address) else {
                    return false;
                };
                let Some(slot) = self.patterns[index].as_mut() else {
                    return false;
                };
                if !slot.handlers.remove(pair) {
                    return false;
                }
                if slot.handlers.is_empty() {
                    self.patterns[index] = None;
                    self.free_slots.push_back(index);
                    self.pattern_index.remove(address);
                    self.pattern_count -= 1;
                    debug!("freed pattern slot {} ({})", index, address);
                }
                self.purge_cache();
                true
            }
            AddressKind::Invalid => false,
        }
    }

    /// Remove an exact address and every handler registered there
    pub fn remove_address(&mut self, address: &str) -> bool {
        if classify(address) != AddressKind::Exact {
            return false;
        }
        match self.routes.get(address) {
            Some(route) if route.origin == RouteOrigin::Registered => {
                self.routes.remove(address);
                debug!("removed address {}", address);
                true
            }
            _ => false,
        }
    }

    /// Collect the handlers for `address` into `matched`, in call order.
    ///
    /// Returns whether any handler was found. Nothing is invoked here, so the
    /// caller can release its lock before running callbacks that may register
    /// or remove handlers themselves.
    pub fn resolve(&mut self, address: &[u8], matched: &mut Vec<HandlerPair>) -> bool {
        matched.clear();
        if let Some(route) = self.routes.get_bytes(address) {
            matched.extend(route.handlers.iter().cloned());
            return true;
        }
        if self.pattern_count == 0 {
            return false;
        }

        let Ok(address) = std::str::from_utf8(address) else {
            return false;
        };
        if classify(address) != AddressKind::Exact {
            return false;
        }

        let mut union = HandlerSet::new();
        for slot in self.patterns.iter().flatten() {
            self.pattern_tests += 1;
            if slot.pattern.matches(address) {
                union.extend_from(&slot.handlers);
            }
        }
        if union.is_empty() {
            return false;
        }

        matched.extend(union.iter().cloned());
        if self.cached_routes < self.cache_limit {
            self.routes.insert(
                address,
                Route {
                    handlers: union,
                    origin: RouteOrigin::PatternCache,
                },
            );
            self.cached_routes += 1;
        } else {
            trace!("pattern cache full, not caching {}", address);
        }
        true
    }

    /// Cap the number of pattern-matched addresses kept in the exact table.
    ///
    /// Past the cap, new addresses still dispatch but rescan the patterns on
    /// every message. Lowering the cap below the current cache size drops the
    /// cache.
    pub fn set_cache_limit(&mut self, limit: usize) {
        self.cache_limit = limit;
        if self.cached_routes > limit {
            self.purge_cache();
        }
    }

    /// Pattern-matched addresses currently cached
    pub fn cached_route_count(&self) -> usize {
        self.cached_routes
    }

    fn purge_cache(&mut self) {
        if self.cached_routes == 0 {
            return;
        }
        self.routes
            .retain(|_, route| route.origin == RouteOrigin::Registered);
        self.cached_routes = 0;
    }

    /// Handlers registered at exact addresses and patterns
    pub fn handler_count(&self) -> usize {
        let exact: usize = self
            .routes
            .iter()
            .filter(|(_, route)| route.origin == RouteOrigin::Registered)
            .map(|(_, route)| route.handlers.len())
            .sum();
        let patterns: usize = self
            .patterns
            .iter()
            .flatten()
            .map(|slot| slot.handlers.len())
            .sum();
        exact + patterns
    }

    /// Exact addresses with registered handlers
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.routes
            .iter()
            .filter(|(_, route)| route.origin == RouteOrigin::Registered)
            .map(|(address, _)| address)
    }

    /// Live patterns
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().flatten().map(|slot| slot.pattern.as_str())
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }

    /// Pattern match attempts made so far
    pub fn pattern_test_count(&self) -> u64 {
        self.pattern_tests
    }

    /// How an address is currently routed, if at all
    pub fn route_origin(&self, address: &str) -> Option<RouteOrigin> {
        self.routes.get(address).map(|route| route.origin)
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}
