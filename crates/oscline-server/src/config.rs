//! Server and client configuration

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use crate::error::{Result, ServerError};

/// OSC server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Local IP to bind (default: "0.0.0.0")
    pub bind_addr: String,
    /// UDP port to listen on; 0 picks a free port
    pub port: u16,
    /// Receive buffer size in bytes; larger datagrams are truncated
    pub buffer_size: usize,
    /// Socket read timeout, so the loop can notice disposal (0 blocks)
    pub read_timeout_ms: u64,
    /// Kernel receive buffer size (SO_RCVBUF), if set
    pub recv_buffer_size: Option<usize>,
    /// Initial address table capacity
    pub address_capacity: usize,
    /// Pattern-matched addresses cached before caching stops
    pub pattern_cache_limit: usize,
    /// Name of the receive thread
    pub thread_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: oscline_core::DEFAULT_PORT,
            buffer_size: 4096,
            read_timeout_ms: 250,
            recv_buffer_size: None,
            address_capacity: oscline_core::table::DEFAULT_CAPACITY,
            pattern_cache_limit: crate::space::DEFAULT_CACHE_LIMIT,
            thread_name: "osc-receive".to_string(),
        }
    }
}

impl ServerConfig {
    /// Default configuration on a given port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// The socket address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind_addr
            .parse()
            .map_err(|_| ServerError::Config(format!("invalid bind address: {}", self.bind_addr)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(ServerError::Config("buffer_size must be non-zero".to_string()));
        }
        self.socket_addr().map(|_| ())
    }
}

/// OSC client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Destination host name or IP
    pub host: String,
    /// Destination port
    pub port: u16,
    /// Writer buffer capacity in bytes
    pub capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: oscline_core::DEFAULT_PORT,
            capacity: oscline_core::writer::DEFAULT_CAPACITY,
        }
    }
}
