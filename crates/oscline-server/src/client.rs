//! OSC client
//!
//! Sends single-argument messages over a connected UDP socket, reusing one
//! writer buffer for every send.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use oscline_core::{tag_word, Argument, OscWriter};
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::{Result, ServerError};

/// UDP sender for OSC messages
#[derive(Debug)]
pub struct OscClient {
    socket: UdpSocket,
    destination: SocketAddr,
    writer: OscWriter,
}

impl OscClient {
    /// Client for `host:port` with the default buffer size
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_config(&ClientConfig {
            host: host.to_string(),
            port,
            ..Default::default()
        })
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let destination = (config.host.as_str(), config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ServerError::Config(format!("cannot resolve host: {}", config.host)))?;

        let local: SocketAddr = match destination {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        if let SocketAddr::V4(addr) = destination {
            if addr.ip().is_broadcast() {
                socket.set_broadcast(true)?;
            }
        }
        socket.connect(destination)?;
        debug!("OSC client sending to {}", destination);

        Ok(Self {
            socket,
            destination,
            writer: OscWriter::with_capacity(config.capacity),
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Send a message with no arguments
    pub fn send_empty(&mut self, address: &str) -> Result<()> {
        self.writer.write_address_and_tags(address, tag_word::EMPTY)?;
        self.flush()
    }

    /// Send a message carrying one value
    ///
    /// ```no_run
    /// use oscline_server::OscClient;
    ///
    /// let mut client = OscClient::new("127.0.0.1", 9000)?;
    /// client.send("/synth/1/freq", 440.0f32)?;
    /// client.send("/synth/1/name", "lead")?;
    /// # Ok::<(), oscline_server::ServerError>(())
    /// ```
    pub fn send<A: Argument>(&mut self, address: &str, value: A) -> Result<()> {
        self.writer.write_message(address, &value)?;
        self.flush()
    }

    pub fn send_nil(&mut self, address: &str) -> Result<()> {
        self.writer.write_address_and_tags(address, tag_word::NIL)?;
        self.flush()
    }

    pub fn send_infinitum(&mut self, address: &str) -> Result<()> {
        self.writer.write_address_and_tags(address, tag_word::INFINITUM)?;
        self.flush()
    }

    /// Send bytes built elsewhere, such as a bundle
    pub fn send_raw(&self, datagram: &[u8]) -> Result<()> {
        self.socket.send(datagram)?;
        Ok(())
    }

    /// Send whatever the writer currently holds
    fn flush(&mut self) -> Result<()> {
        let bytes = self.writer.as_bytes();
        trace!("sending {} bytes to {}", bytes.len(), self.destination);
        self.socket.send(bytes)?;
        Ok(())
    }
}
