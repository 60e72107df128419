//! Oscline Server
//!
//! UDP receive loop and address-space dispatch for Open Sound Control.
//!
//! This crate provides:
//! - The receiving server with its per-port registry ([`OscServer`])
//! - Exact and pattern address routing with a pattern cache ([`AddressSpace`])
//! - Read callbacks on the receive thread plus deferred callbacks drained by
//!   the host ([`HandlerPair`], [`DeferredQueue`])
//! - Monitor callbacks for inspection tools ([`Monitors`])
//! - A small UDP sender ([`OscClient`])
//!
//! ```no_run
//! use oscline_server::OscServer;
//!
//! let server = OscServer::new(9000)?;
//! server.add_method("/synth/1/freq", |values| {
//!     if let Ok(freq) = values.read_float(0) {
//!         println!("freq {}", freq);
//!     }
//! })?;
//!
//! loop {
//!     server.drain();
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! # Ok::<(), oscline_server::ServerError>(())
//! ```

pub mod client;
pub mod config;
pub mod deferred;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod monitor;
pub mod server;
pub mod space;

pub use client::OscClient;
pub use config::{ClientConfig, ServerConfig};
pub use deferred::DeferredQueue;
pub use dispatch::Dispatcher;
pub use error::{Result, ServerError};
pub use handler::{DeferredFn, HandlerPair, HandlerSet, ReadFn};
pub use monitor::{describe_message, MonitorCallback, MonitorFn, Monitors};
pub use server::OscServer;
pub use space::{AddressSpace, RouteOrigin, DEFAULT_CACHE_LIMIT};

pub use oscline_core::MessageValues;
