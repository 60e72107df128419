//! oscline Core
//!
//! Zero-copy Open Sound Control wire format.
//!
//! This crate provides:
//! - Message parsing over borrowed datagram bytes ([`OscParser`])
//! - Typed element readers with OSC coercion rules ([`MessageValues`])
//! - A fixed-capacity encoder ([`OscWriter`], [`Argument`])
//! - An address table probed straight from raw bytes ([`AddressTable`])
//! - Address classification and wildcard patterns ([`Pattern`])
//! - Payload value types ([`Color32`], [`MidiMessage`], [`NtpTimestamp`], ...)
//!
//! Nothing here touches the network; see `oscline-server` for the receive
//! loop and dispatch.
//!
//! ```
//! use oscline_core::{tag_word, OscParser, OscWriter};
//!
//! let mut writer = OscWriter::new();
//! writer.write_address_and_tags("/synth/1/freq", tag_word::FLOAT32).unwrap();
//! writer.write_float(440.0).unwrap();
//!
//! let mut parser = OscParser::new();
//! let bytes = writer.as_bytes();
//! parser.parse(bytes, 0).unwrap();
//! assert_eq!(parser.values(bytes).read_float(0).unwrap(), 440.0);
//! ```

pub mod address;
pub mod error;
pub mod key;
pub mod parser;
pub mod table;
pub mod tags;
pub mod types;
pub mod values;
pub mod writer;

pub use address::{classify, is_valid_address, AddressKind, Pattern};
pub use error::{Error, Result};
pub use key::AddressEntry;
pub use parser::{align4, bundle_timestamp, is_bundle, is_bundle_at, read_u32_at, OscParser};
pub use table::AddressTable;
pub use tags::TypeTag;
pub use types::*;
pub use values::MessageValues;
pub use writer::{pack_tag_word, tag_word, Argument, ElementMark, OscWriter};

/// Default UDP port for OSC servers
pub const DEFAULT_PORT: u16 = 9000;

/// Deepest bundle nesting that is dispatched
pub const MAX_BUNDLE_DEPTH: usize = 16;
