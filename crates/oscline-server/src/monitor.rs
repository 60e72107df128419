//! Monitor callbacks
//!
//! Monitors see every message that parses, whether or not a handler matched,
//! after handlers have run. They are meant for logging and inspection tools.

use std::fmt::Write as _;
use std::sync::Arc;

use oscline_core::{MessageValues, TypeTag};
use parking_lot::RwLock;

/// Monitor callback signature: decoded address and the message values
pub type MonitorFn = dyn Fn(&str, &MessageValues<'_>) + Send + Sync;

/// Handle to a registered monitor, used to remove it again
#[derive(Clone)]
pub struct MonitorCallback(Arc<MonitorFn>);

impl MonitorCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str, &MessageValues<'_>) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    fn same_as(&self, other: &MonitorCallback) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl std::fmt::Debug for MonitorCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MonitorCallback")
            .field(&Arc::as_ptr(&self.0))
            .finish()
    }
}

/// Registered monitors
///
/// Callbacks run under a read lock; adding or removing a monitor from inside
/// a monitor callback deadlocks.
#[derive(Default)]
pub struct Monitors {
    callbacks: RwLock<Vec<MonitorCallback>>,
}

impl Monitors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, callback: MonitorCallback) {
        self.callbacks.write().push(callback);
    }

    pub fn remove(&self, callback: &MonitorCallback) -> bool {
        let mut callbacks = self.callbacks.write();
        match callbacks.iter().position(|c| c.same_as(callback)) {
            Some(index) => {
                callbacks.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    pub fn notify(&self, address: &str, values: &MessageValues<'_>) {
        for callback in self.callbacks.read().iter() {
            (callback.0)(address, values);
        }
    }
}

impl std::fmt::Debug for Monitors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitors").field("len", &self.len()).finish()
    }
}

/// Render a message as `"/address  ,tags  value value"` for logs
pub fn describe_message(address: &str, values: &MessageValues<'_>) -> String {
    let mut out = String::with_capacity(address.len() + 16 + values.element_count() * 8);
    out.push_str(address);
    out.push_str("  ,");
    for tag in values.tags() {
        out.push(char::from(tag));
    }

    if values.is_empty() {
        return out;
    }

    out.push(' ');
    for index in 0..values.element_count() {
        out.push(' ');
        match values.tag(index) {
            Some(TypeTag::Blob) => {
                let len = values.blob_slice(index).map(<[u8]>::len).unwrap_or(0);
                let _ = write!(out, "blob[{}]", len);
            }
            Some(TypeTag::String) | Some(TypeTag::AltString) => {
                let text = values.read_string(index).unwrap_or_default();
                let _ = write!(out, "{:?}", text);
            }
            Some(TypeTag::ArrayStart) => out.push('['),
            Some(TypeTag::ArrayEnd) => out.push(']'),
            Some(_) => match values.read_string(index) {
                Ok(text) => out.push_str(&text),
                Err(_) => out.push('?'),
            },
            None => out.push('?'),
        }
    }
    out
}
