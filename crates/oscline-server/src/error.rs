//! Server error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("port {0} is already in use, cannot start a new OSC server on it")]
    PortInUse(u16),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("receive thread panicked")]
    ReceiveThreadPanicked,

    #[error("server disposed")]
    Disposed,

    #[error("wire format error: {0}")]
    Core(#[from] oscline_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
