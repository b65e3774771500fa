use crate::*;

/// A frame tagged 5 reaches the type-5 handler with the tag stripped.
#[test]
fn test_registered_handler_receives_payload() {
    let (transport, mux) = mux();
    let h = Recorder::new();
    mux.register_handler(ServiceType(5), h.clone());

    assert!(transport.inject(raw_message(&[5, b'h', b'i']), 4000));

    assert_eq!(
        h.calls(),
        vec![Call {
            sender: 4000,
            payload: b"hi".to_vec()
        }]
    );
}

/// An empty frame never reaches a handler and the dispatcher keeps going.
#[test]
fn test_empty_frame_is_dropped() {
    let (transport, mux) = mux();
    let h = Recorder::new();
    mux.register_handler(ServiceType(0), h.clone());

    transport.inject(raw_message(&[]), 1);
    assert!(h.calls().is_empty());

    transport.inject_frame(ServiceType(0), b"after", 1);
    assert_eq!(h.calls().len(), 1);
}

/// Unregistered types are dropped without replies and without disturbing
/// registered services.
#[test]
fn test_unknown_type_is_dropped() {
    let (transport, mux) = mux();
    let h = Recorder::new();
    mux.register_handler(ServiceType(10), h.clone());

    for ty in [11u8, 200, 255] {
        transport.inject_frame(ServiceType(ty), b"nobody home", 3);
    }
    assert!(h.calls().is_empty());
    assert!(transport.sent().is_empty());

    transport.inject_frame(ServiceType(10), b"home", 3);
    assert_eq!(h.calls()[0].payload, b"home".to_vec());
}

/// Garbage that is not even a netlink header is dropped.
#[test]
fn test_truncated_buffer_is_dropped() {
    let (transport, mux) = mux();
    let h = Recorder::new();
    mux.register_handler(ServiceType(1), h.clone());

    transport.inject(vec![1u8, 2, 3, 4, 5], 1);
    transport.inject(Vec::<u8>::new(), 1);
    assert!(h.calls().is_empty());
}

/// Re-registering a type switches subsequent traffic to the new handler.
#[test]
fn test_reregistration_replaces_handler() {
    let (transport, mux) = mux();
    let first = Recorder::new();
    let second = Recorder::new();

    mux.register_handler(ServiceType(7), first.clone());
    transport.inject_frame(ServiceType(7), b"one", 1);
    mux.register_handler(ServiceType(7), second.clone());
    transport.inject_frame(ServiceType(7), b"two", 1);

    assert_eq!(first.calls().len(), 1);
    assert_eq!(second.calls()[0].payload, b"two".to_vec());
}

/// Echo round trip: request on the echo type, reply to the sender port.
#[test]
fn test_echo_service_round_trip() -> Result<()> {
    let mut config = NlmuxConfig::default();
    config.services.echo = true;
    config.services.echo_type = ServiceType(2);
    config.services.echo_reply_type = ServiceType(3);
    let (transport, _mux) = mux_with(&config);

    transport.inject_frame(ServiceType(2), b"marco", 5150);

    let sent = transport.take_sent();
    anyhow::ensure!(sent.len() == 1, "expected one reply, got {}", sent.len());
    assert_eq!(sent[0].destination, nlmux_core::Destination::Port(5150));
    assert_eq!(outbound_frame(&sent[0].skb)?, b"\x03marco".to_vec());
    Ok(())
}

/// The default service swallows type-0 traffic without replying.
#[test]
fn test_default_service_only_logs() {
    let (transport, _mux) = mux();
    transport.inject_frame(ServiceType::DEFAULT, b"hello", 12);
    assert!(transport.sent().is_empty());
}
