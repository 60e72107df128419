//! Server tests
//!
//! Real UDP round trips through a running receive thread.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use oscline_core::Color32;
use oscline_server::{HandlerPair, OscClient, OscServer, ServerConfig, ServerError};
use oscline_test_utils::{
    bundle, find_available_udp_port, message, send_datagram, wait_for, Collector,
    DEFAULT_CHECK_INTERVAL, DEFAULT_TIMEOUT,
};

fn local_server() -> OscServer {
    OscServer::bind(ServerConfig {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        read_timeout_ms: 50,
        ..Default::default()
    })
    .unwrap()
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_ephemeral_port_is_reported() {
    let server = local_server();
    assert_ne!(server.port(), 0);
    assert_eq!(server.local_addr().port(), server.port());
    assert!(server.is_running());
}

#[test]
fn test_second_server_on_same_port_fails() {
    let server = local_server();
    let err = OscServer::bind(ServerConfig {
        bind_addr: "127.0.0.1".to_string(),
        port: server.port(),
        ..Default::default()
    })
    .unwrap_err();
    assert!(matches!(err, ServerError::PortInUse(port) if port == server.port()));
}

#[test]
fn test_dispose_stops_receive_thread_and_frees_port() {
    let server = local_server();
    let port = server.port();

    server.dispose().unwrap();
    assert!(server.is_disposed());
    assert!(!server.is_running());
    // second dispose is a no-op
    server.dispose().unwrap();

    assert!(matches!(
        server.add_method("/a", |_| {}),
        Err(ServerError::Disposed)
    ));

    let again = OscServer::bind(ServerConfig {
        bind_addr: "127.0.0.1".to_string(),
        port,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(again.port(), port);
}

#[test]
fn test_dispose_from_blocking_receive() {
    let server = OscServer::bind(ServerConfig {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        read_timeout_ms: 0,
        ..Default::default()
    })
    .unwrap();

    // no timeout: only the wake datagram unblocks the loop
    server.dispose().unwrap();
    assert!(!server.is_running());
}

#[test]
fn test_get_or_create_shares_one_server() {
    let port = find_available_udp_port();

    let first = OscServer::get_or_create(port).unwrap();
    let second = OscServer::get_or_create(port).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert!(OscServer::remove(port));
    assert!(first.is_disposed());
    assert!(!OscServer::remove(port));
}

#[test]
fn test_invalid_address_rejected() {
    let server = local_server();
    assert!(matches!(
        server.add_method("no/slash", |_| {}),
        Err(ServerError::InvalidAddress(_))
    ));
    assert_eq!(server.handler_count(), 0);
}

// ============================================================================
// Receiving
// ============================================================================

#[test]
fn test_client_to_server_float() {
    let server = local_server();
    let freqs = Collector::new();

    let sink = freqs.clone();
    server
        .add_method("/synth/1/freq", move |values| {
            sink.push(values.read_float(0).unwrap());
        })
        .unwrap();

    let mut client = OscClient::new("127.0.0.1", server.port()).unwrap();
    client.send("/synth/1/freq", 440.0f32).unwrap();

    assert!(freqs.wait_for_count(1, DEFAULT_TIMEOUT));
    assert_eq!(freqs.last(), Some(440.0));
}

#[test]
fn test_client_sends_every_kind() {
    let server = local_server();
    let seen = Collector::new();

    for address in ["/int", "/string", "/color", "/empty", "/nil", "/flag"] {
        let sink = seen.clone();
        server
            .add_method(address, move |values| {
                let text = values
                    .tags()
                    .map(char::from)
                    .collect::<String>();
                sink.push((address, text));
            })
            .unwrap();
    }

    let mut client = OscClient::new("127.0.0.1", server.port()).unwrap();
    client.send("/int", 7i32).unwrap();
    client.send("/string", "hello").unwrap();
    client.send("/color", Color32::new(255, 0, 0, 255)).unwrap();
    client.send_empty("/empty").unwrap();
    client.send_nil("/nil").unwrap();
    client.send("/flag", true).unwrap();

    assert!(seen.wait_for_count(6, DEFAULT_TIMEOUT));
    let mut values = seen.values();
    values.sort();
    assert_eq!(
        values,
        vec![
            ("/color", "r".to_string()),
            ("/empty", String::new()),
            ("/flag", "T".to_string()),
            ("/int", "i".to_string()),
            ("/nil", "N".to_string()),
            ("/string", "s".to_string()),
        ]
    );
}

#[test]
fn test_rosc_encoded_bundle_received() {
    use rosc::{encoder, OscBundle, OscMessage, OscPacket, OscTime, OscType};

    let server = local_server();
    let seen = Collector::new();

    let sink = seen.clone();
    server
        .add_method("/layer/*/opacity", move |values| {
            sink.push(values.read_float(0).unwrap());
        })
        .unwrap();

    let packet = OscPacket::Bundle(OscBundle {
        timetag: OscTime {
            seconds: 0,
            fractional: 1,
        },
        content: vec![
            OscPacket::Message(OscMessage {
                addr: "/layer/1/opacity".to_string(),
                args: vec![OscType::Float(0.25)],
            }),
            OscPacket::Message(OscMessage {
                addr: "/layer/2/opacity".to_string(),
                args: vec![OscType::Float(0.75)],
            }),
        ],
    });
    send_datagram(server.port(), &encoder::encode(&packet).unwrap());

    assert!(seen.wait_for_count(2, DEFAULT_TIMEOUT));
    assert_eq!(seen.values(), vec![0.25, 0.75]);
    assert_eq!(server.pattern_count(), 1);
}

#[test]
fn test_deferred_callbacks_wait_for_drain() {
    let server = local_server();
    let reads = Arc::new(AtomicU32::new(0));
    let ticks = Arc::new(AtomicU32::new(0));

    let read_counter = Arc::clone(&reads);
    let tick_counter = Arc::clone(&ticks);
    server
        .add_method_with_deferred(
            "/cue/go",
            move |_| {
                read_counter.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                tick_counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();

    send_datagram(server.port(), &message("/cue/go", 1i32));
    assert!(oscline_test_utils::wait_for_count(&reads, 1, DEFAULT_TIMEOUT));

    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert_eq!(server.pending_deferred(), 1);
    assert_eq!(server.drain(), 1);
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
}

#[test]
fn test_removed_method_stops_receiving() {
    let server = local_server();
    let hits = Collector::new();

    let sink = hits.clone();
    let pair = server.add_method("/a", move |_| sink.push(())).unwrap();
    let marker = Collector::new();
    let done = marker.clone();
    server.add_method("/done", move |_| done.push(())).unwrap();

    assert!(server.remove_method("/a", &pair));
    assert!(!server.remove_method("/a", &pair));

    let port = server.port();
    send_datagram(port, &message("/a", 1i32));
    send_datagram(port, &message("/done", 1i32));

    assert!(marker.wait_for_count(1, DEFAULT_TIMEOUT));
    assert_eq!(hits.count(), 0);
}

#[test]
fn test_monitor_callback_sees_traffic() {
    let server = local_server();
    let seen = Collector::new();

    let sink = seen.clone();
    let monitor = server.add_monitor_callback(move |address, _| sink.push(address.to_string()));

    send_datagram(
        server.port(),
        &bundle(&[&message("/x", 1i32), &message("/y", 2i32)]),
    );
    assert!(seen.wait_for_count(2, DEFAULT_TIMEOUT));
    assert_eq!(seen.values(), vec!["/x".to_string(), "/y".to_string()]);

    assert!(server.remove_monitor_callback(&monitor));
}

#[test]
fn test_garbage_datagram_does_not_stop_server() {
    let server = local_server();
    let seen = Collector::new();

    let sink = seen.clone();
    server.add_method("/ok", move |_| sink.push(())).unwrap();

    send_datagram(server.port(), b"\xff\xfe garbage");
    send_datagram(server.port(), &message("/ok", 1i32));

    assert!(seen.wait_for_count(1, DEFAULT_TIMEOUT));
    assert!(wait_for(|| server.is_running(), DEFAULT_CHECK_INTERVAL, DEFAULT_TIMEOUT));
}

#[test]
fn test_oversized_datagram_does_not_stop_server() {
    let server = OscServer::bind(ServerConfig {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        read_timeout_ms: 50,
        buffer_size: 16,
        ..Default::default()
    })
    .unwrap();
    let seen = Collector::new();

    let sink = seen.clone();
    server.add_method("/ok", move |_| sink.push(())).unwrap();

    send_datagram(server.port(), &message("/a/very/long/address/for/a/small/buffer", 1i32));
    send_datagram(server.port(), &message("/ok", 1i32));

    assert!(seen.wait_for_count(1, DEFAULT_TIMEOUT));
    assert!(server.is_running());
    server.dispose().unwrap();
}

// ============================================================================
// Re-entrant registration
// ============================================================================

#[test]
fn test_handler_can_remove_itself() {
    let server = Arc::new(local_server());
    let removed = Collector::new();
    let marker = Collector::new();

    let slot: Arc<Mutex<Option<HandlerPair>>> = Arc::new(Mutex::new(None));
    let weak: Weak<OscServer> = Arc::downgrade(&server);
    let handler_slot = Arc::clone(&slot);
    let sink = removed.clone();
    let pair = server
        .add_method("/once", move |_| {
            let (Some(server), Some(pair)) = (weak.upgrade(), handler_slot.lock().unwrap().take())
            else {
                return;
            };
            sink.push(server.remove_method("/once", &pair));
        })
        .unwrap();
    *slot.lock().unwrap() = Some(pair);

    let done = marker.clone();
    server.add_method("/done", move |_| done.push(())).unwrap();

    let port = server.port();
    send_datagram(port, &message("/once", 1i32));
    send_datagram(port, &message("/once", 2i32));
    send_datagram(port, &message("/done", 1i32));

    assert!(marker.wait_for_count(1, DEFAULT_TIMEOUT));
    assert_eq!(removed.values(), vec![true]);
    // the host can still take the registration lock
    assert_eq!(server.handler_count(), 1);
    assert_eq!(server.addresses(), vec!["/done".to_string()]);
    server.dispose().unwrap();
}

#[test]
fn test_handler_can_register_another() {
    let server = Arc::new(local_server());
    let late = Collector::new();
    let marker = Collector::new();

    let weak = Arc::downgrade(&server);
    let sink = late.clone();
    server
        .add_method("/arm", move |_| {
            let Some(server) = weak.upgrade() else {
                return;
            };
            let sink = sink.clone();
            server
                .add_method("/armed", move |values| sink.push(values.read_int(0).unwrap()))
                .unwrap();
        })
        .unwrap();
    let done = marker.clone();
    server.add_method("/done", move |_| done.push(())).unwrap();

    let port = server.port();
    send_datagram(port, &message("/arm", 1i32));
    send_datagram(port, &message("/armed", 7i32));
    send_datagram(port, &message("/done", 1i32));

    assert!(marker.wait_for_count(1, DEFAULT_TIMEOUT));
    assert_eq!(late.values(), vec![7]);
    server.dispose().unwrap();
}
