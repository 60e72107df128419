//! OSC server
//!
//! One server owns one UDP port and one receive thread:
//!
//! ```text
//!  ┌──────────────── receive thread ────────────────┐      ┌─── host thread ───┐
//!  │ recv ─► Dispatcher ─► read callbacks           │      │                   │
//!  │                    └─► DeferredQueue::push ────┼─────►│ server.drain()    │
//!  └────────────────────────────────────────────────┘      └───────────────────┘
//! ```
//!
//! Read callbacks run on the receive thread and borrow the receive buffer for
//! the duration of the call only. Deferred callbacks run wherever the host
//! calls [`OscServer::drain`].
//!
//! A port can be held by at most one server in the process at a time.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use oscline_core::MessageValues;
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::deferred::DeferredQueue;
use crate::dispatch::Dispatcher;
use crate::error::{Result, ServerError};
use crate::handler::HandlerPair;
use crate::monitor::{MonitorCallback, Monitors};
use crate::space::AddressSpace;

/// Ports held by live servers in this process
fn claimed_ports() -> &'static DashSet<u16> {
    static PORTS: OnceLock<DashSet<u16>> = OnceLock::new();
    PORTS.get_or_init(DashSet::new)
}

/// Servers created through [`OscServer::get_or_create`]
fn shared_servers() -> &'static DashMap<u16, Arc<OscServer>> {
    static SERVERS: OnceLock<DashMap<u16, Arc<OscServer>>> = OnceLock::new();
    SERVERS.get_or_init(DashMap::new)
}

/// A port held in the process-wide registry until dropped
#[derive(Debug)]
struct PortClaim(u16);

impl PortClaim {
    fn acquire(port: u16) -> Result<Self> {
        if claimed_ports().insert(port) {
            Ok(Self(port))
        } else {
            Err(ServerError::PortInUse(port))
        }
    }
}

impl Drop for PortClaim {
    fn drop(&mut self) {
        claimed_ports().remove(&self.0);
    }
}

/// OSC server bound to one UDP port
pub struct OscServer {
    port: u16,
    local_addr: SocketAddr,
    space: Arc<Mutex<AddressSpace>>,
    deferred: Arc<DeferredQueue>,
    monitors: Arc<Monitors>,
    disposed: Arc<AtomicBool>,
    receiver: Mutex<Option<JoinHandle<()>>>,
    claim: Mutex<Option<PortClaim>>,
}

impl OscServer {
    /// Start a server on `port` with default settings
    pub fn new(port: u16) -> Result<Self> {
        Self::bind(ServerConfig::with_port(port))
    }

    /// Bind the socket and start the receive thread
    pub fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let requested = config.socket_addr()?;

        // fixed ports are claimed before binding; ephemeral ones once known
        let early_claim = if requested.port() != 0 {
            Some(PortClaim::acquire(requested.port())?)
        } else {
            None
        };

        let socket = open_socket(&config, requested)?;
        let local_addr = socket.local_addr()?;
        let claim = match early_claim {
            Some(claim) => claim,
            None => PortClaim::acquire(local_addr.port())?,
        };

        let mut space = AddressSpace::with_capacity(config.address_capacity);
        space.set_cache_limit(config.pattern_cache_limit);
        let space = Arc::new(Mutex::new(space));
        let deferred = Arc::new(DeferredQueue::new());
        let monitors = Arc::new(Monitors::new());
        let disposed = Arc::new(AtomicBool::new(false));

        let dispatcher = Dispatcher::new(
            Arc::clone(&space),
            Arc::clone(&deferred),
            Arc::clone(&monitors),
        );
        let loop_disposed = Arc::clone(&disposed);
        let buffer_size = config.buffer_size;
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || receive_loop(socket, dispatcher, buffer_size, loop_disposed))?;

        info!("OSC server listening on {}", local_addr);

        Ok(Self {
            port: local_addr.port(),
            local_addr,
            space,
            deferred,
            monitors,
            disposed,
            receiver: Mutex::new(Some(handle)),
            claim: Mutex::new(Some(claim)),
        })
    }

    /// The shared server for `port`, created on first use
    pub fn get_or_create(port: u16) -> Result<Arc<OscServer>> {
        use dashmap::mapref::entry::Entry;

        match shared_servers().entry(port) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let server = Arc::new(OscServer::new(port)?);
                entry.insert(Arc::clone(&server));
                Ok(server)
            }
        }
    }

    /// Dispose and forget the shared server for `port`
    pub fn remove(port: u16) -> bool {
        match shared_servers().remove(&port) {
            Some((_, server)) => {
                if let Err(e) = server.dispose() {
                    warn!("OSC server on port {} stopped with error: {}", port, e);
                }
                true
            }
            None => false,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a read callback at an address or pattern.
    ///
    /// The returned pair identifies the callback for [`remove_method`].
    ///
    /// [`remove_method`]: Self::remove_method
    pub fn add_method<F>(&self, address: &str, read: F) -> Result<HandlerPair>
    where
        F: Fn(&MessageValues<'_>) + Send + Sync + 'static,
    {
        let pair = HandlerPair::new(read);
        self.add_method_pair(address, pair.clone())?;
        Ok(pair)
    }

    /// Register a read callback plus a deferred follow-up for [`drain`](Self::drain)
    pub fn add_method_with_deferred<F, D>(
        &self,
        address: &str,
        read: F,
        deferred: D,
    ) -> Result<HandlerPair>
    where
        F: Fn(&MessageValues<'_>) + Send + Sync + 'static,
        D: Fn() + Send + Sync + 'static,
    {
        let pair = HandlerPair::with_deferred(read, deferred);
        self.add_method_pair(address, pair.clone())?;
        Ok(pair)
    }

    /// Register an existing handler pair.
    ///
    /// Safe to call from a read callback; the change applies from the next
    /// message on.
    pub fn add_method_pair(&self, address: &str, pair: HandlerPair) -> Result<()> {
        if self.is_disposed() {
            return Err(ServerError::Disposed);
        }
        self.space.lock().add(address, pair)
    }

    /// Remove one registration of `pair` from an address or pattern.
    ///
    /// A read callback may remove itself; handlers already resolved for the
    /// current message still run.
    pub fn remove_method(&self, address: &str, pair: &HandlerPair) -> bool {
        self.space.lock().remove(address, pair)
    }

    /// Remove an exact address and all of its handlers
    pub fn remove_address(&self, address: &str) -> bool {
        self.space.lock().remove_address(address)
    }

    /// Observe every parsed message. Monitors add per-message work, so keep
    /// them to inspection tools.
    pub fn add_monitor_callback<F>(&self, callback: F) -> MonitorCallback
    where
        F: Fn(&str, &MessageValues<'_>) + Send + Sync + 'static,
    {
        let callback = MonitorCallback::new(callback);
        self.monitors.add(callback.clone());
        callback
    }

    pub fn remove_monitor_callback(&self, callback: &MonitorCallback) -> bool {
        self.monitors.remove(callback)
    }

    // ------------------------------------------------------------------
    // Host tick
    // ------------------------------------------------------------------

    /// Run every deferred callback queued so far. Call once per host tick.
    pub fn drain(&self) -> usize {
        self.deferred.drain()
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn handler_count(&self) -> usize {
        self.space.lock().handler_count()
    }

    /// Exact addresses with registered handlers
    pub fn addresses(&self) -> Vec<String> {
        self.space.lock().addresses().map(str::to_string).collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.space.lock().pattern_count()
    }

    /// Pattern match attempts so far; stays flat once an address is cached
    pub fn pattern_test_count(&self) -> u64 {
        self.space.lock().pattern_test_count()
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Whether the receive thread is still running
    pub fn is_running(&self) -> bool {
        self.receiver
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the receive thread and release the port.
    ///
    /// Fails only if a callback panicked on the receive thread. An in-flight
    /// dispatch finishes first. Calling this again is a no-op.
    pub fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.wake();

        let handle = self.receiver.lock().take();
        let result = match handle {
            // disposing from a handler: the loop exits once the handler returns
            Some(handle) if handle.thread().id() == thread::current().id() => Ok(()),
            Some(handle) => handle.join().map_err(|_| {
                error!("OSC receive thread on port {} panicked", self.port);
                ServerError::ReceiveThreadPanicked
            }),
            None => Ok(()),
        };

        self.claim.lock().take();
        info!("OSC server on port {} disposed", self.port);
        result
    }

    /// Unblock the receive call with an empty datagram
    fn wake(&self) {
        let target = wake_addr(self.local_addr);
        let local: SocketAddr = match target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        if let Err(e) = UdpSocket::bind(local).and_then(|socket| socket.send_to(&[], target)) {
            debug!("wake datagram to {} failed: {}", target, e);
        }
    }
}

impl Drop for OscServer {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            warn!("OSC server on port {} stopped with error: {}", self.port, e);
        }
    }
}

impl std::fmt::Debug for OscServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OscServer")
            .field("local_addr", &self.local_addr)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Build the UDP socket described by `config`
fn open_socket(config: &ServerConfig, addr: SocketAddr) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    if let Some(size) = config.recv_buffer_size {
        socket.set_recv_buffer_size(size)?;
    }
    socket.bind(&addr.into()).map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => ServerError::PortInUse(addr.port()),
        _ => ServerError::Io(e),
    })?;

    let socket: UdpSocket = socket.into();
    let timeout = (config.read_timeout_ms > 0).then(|| Duration::from_millis(config.read_timeout_ms));
    socket.set_read_timeout(timeout)?;
    Ok(socket)
}

/// Where to send the wake datagram for a socket bound at `local`
fn wake_addr(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

/// Pause after a socket error before receiving again
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// What the receive loop does after a failed `recv`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecvAction {
    /// Timeouts, interrupts and ICMP echoes; receive again quietly
    Retry,
    /// Any other socket error, such as an oversized datagram; log and receive again
    Warn,
    /// The server is shutting down
    Stop,
}

fn recv_action(e: &std::io::Error, disposed: bool) -> RecvAction {
    use std::io::ErrorKind::*;
    if disposed {
        return RecvAction::Stop;
    }
    match e.kind() {
        WouldBlock | TimedOut | Interrupted | ConnectionReset | ConnectionRefused => {
            RecvAction::Retry
        }
        _ => RecvAction::Warn,
    }
}

/// Runs until disposed. Only a panicking callback ends it early.
fn receive_loop(
    socket: UdpSocket,
    mut dispatcher: Dispatcher,
    buffer_size: usize,
    disposed: Arc<AtomicBool>,
) {
    let mut buffer = vec![0u8; buffer_size];

    while !disposed.load(Ordering::Acquire) {
        match socket.recv(&mut buffer) {
            Ok(0) => continue,
            Ok(len) => {
                dispatcher.dispatch(&buffer[..len]);
            }
            Err(e) => match recv_action(&e, disposed.load(Ordering::Acquire)) {
                RecvAction::Retry => continue,
                RecvAction::Warn => {
                    warn!("OSC receive error, still listening: {}", e);
                    thread::sleep(ERROR_BACKOFF);
                }
                RecvAction::Stop => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_addr_uses_loopback_for_unspecified() {
        let v4: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        assert_eq!(wake_addr(v4), "127.0.0.1:9000".parse().unwrap());

        let v6: SocketAddr = "[::]:9000".parse().unwrap();
        assert_eq!(wake_addr(v6), "[::1]:9000".parse().unwrap());

        let fixed: SocketAddr = "10.0.0.5:9000".parse().unwrap();
        assert_eq!(wake_addr(fixed), fixed);
    }

    #[test]
    fn test_port_claim_released_on_drop() {
        let claim = PortClaim::acquire(1).unwrap();
        assert!(matches!(
            PortClaim::acquire(1),
            Err(ServerError::PortInUse(1))
        ));
        drop(claim);
        assert!(PortClaim::acquire(1).is_ok());
    }

    #[test]
    fn test_transient_errors_retry_quietly() {
        use std::io::{Error, ErrorKind};
        assert_eq!(recv_action(&Error::from(ErrorKind::WouldBlock), false), RecvAction::Retry);
        assert_eq!(recv_action(&Error::from(ErrorKind::TimedOut), false), RecvAction::Retry);
        assert_eq!(
            recv_action(&Error::from(ErrorKind::ConnectionReset), false),
            RecvAction::Retry
        );
    }

    #[test]
    fn test_socket_errors_do_not_stop_the_loop() {
        use std::io::{Error, ErrorKind};
        // WSAEMSGSIZE (10040) on Windows when a datagram exceeds the buffer
        let oversized = Error::from_raw_os_error(10040);
        assert_eq!(recv_action(&oversized, false), RecvAction::Warn);
        assert_eq!(
            recv_action(&Error::from(ErrorKind::PermissionDenied), false),
            RecvAction::Warn
        );
        assert_eq!(recv_action(&oversized, true), RecvAction::Stop);
        assert_eq!(recv_action(&Error::from(ErrorKind::WouldBlock), true), RecvAction::Stop);
    }
}
