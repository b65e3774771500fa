use crate::*;

use std::thread;

use nlmux_core::Destination;

/// Registrations on distinct types from many threads, interleaved with
/// live traffic, never disturb each other's slots.
#[test]
fn test_concurrent_registration_and_dispatch() {
    let (transport, mux) = mux();
    let recorders: Vec<_> = (0..32).map(|_| Recorder::new()).collect();

    thread::scope(|s| {
        for (i, r) in recorders.iter().enumerate() {
            let mux = &mux;
            s.spawn(move || {
                let ty = ServiceType(100 + i as u8);
                for _ in 0..20 {
                    mux.register_handler(ty, r.clone());
                }
            });
        }
        let transport = &transport;
        s.spawn(move || {
            for round in 0..200u32 {
                transport.inject_frame(ServiceType(100 + (round % 32) as u8), b"tick", round);
            }
        });
    });

    for (i, r) in recorders.iter().enumerate() {
        let ty = ServiceType(100 + i as u8);
        let bound = mux.registry().lookup(ty).expect("slot bound");
        assert_eq!(bound.name(), "recorder");
        for call in r.calls() {
            assert_eq!(call.payload, b"tick".to_vec());
        }
    }

    // slots outside the range stay untouched
    assert_eq!(mux.registry().bound_types().len(), 33);

    // after the dust settles every type dispatches to its own recorder
    for (i, r) in recorders.iter().enumerate() {
        let before = r.calls().len();
        transport.inject_frame(ServiceType(100 + i as u8), b"final", 1);
        assert_eq!(r.calls().len(), before + 1);
        assert_eq!(r.calls().last().unwrap().payload, b"final".to_vec());
    }
}

/// Many producers sending at once: every frame arrives intact.
#[test]
fn test_concurrent_delivery() {
    let (transport, mux) = mux();

    thread::scope(|s| {
        for t in 0..8u8 {
            let deliverer = mux.deliverer();
            s.spawn(move || {
                for n in 0..50u8 {
                    deliverer
                        .send_unicast_typed(&[t, n], ServiceType(t), 1000 + t as u32)
                        .unwrap();
                }
            });
        }
    });

    let sent = transport.sent();
    assert_eq!(sent.len(), 400);
    for msg in &sent {
        let frame = outbound_frame(&msg.skb).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame[0], frame[1]);
        assert_eq!(msg.destination, Destination::Port(1000 + frame[0] as u32));
    }

    // per-producer order is preserved
    for t in 0..8u8 {
        let seq: Vec<u8> = sent
            .iter()
            .filter_map(|m| {
                let f = outbound_frame(&m.skb).unwrap();
                (f[0] == t).then_some(f[2])
            })
            .collect();
        assert_eq!(seq, (0..50).collect::<Vec<u8>>());
    }
}
