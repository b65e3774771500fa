//! nlmux integration test harness.
//!
//! Every test runs a full `NetlinkMux` against the in-memory loopback
//! transport: frames go in through `inject`, replies come out through
//! `sent()`. No netlink socket or privileges are needed.
//!
//!   cargo test --test integration
//!
//! Set RUST_LOG=debug to see the dispatcher's log lines.

mod concurrency;
mod dispatch;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use zerocopy::AsBytes;

use nlmux::{LoopbackTransport, NetlinkMux};
use nlmux_core::config::NlmuxConfig;
use nlmux_core::wire::{NlMsgHdr, NLMSG_DONE};
use nlmux_core::{ServiceType, SkBuff};
use nlmux_services::ServiceHandler;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Install a test-writer subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A mux over a fresh loopback transport.
pub fn mux_with(config: &NlmuxConfig) -> (Arc<LoopbackTransport>, NetlinkMux) {
    init_tracing();
    let transport = Arc::new(LoopbackTransport::new());
    let mux = NetlinkMux::new(transport.clone(), config).expect("fresh transport accepts input");
    (transport, mux)
}

pub fn mux() -> (Arc<LoopbackTransport>, NetlinkMux) {
    mux_with(&NlmuxConfig::default())
}

/// Raw buffer: netlink header followed by `frame` exactly as given.
pub fn raw_message(frame: &[u8]) -> Vec<u8> {
    let mut buf = NlMsgHdr::for_frame(frame.len())
        .expect("frame fits a netlink message")
        .as_bytes()
        .to_vec();
    buf.extend_from_slice(frame);
    buf
}

/// Check the envelope of an outbound buffer and return its frame.
pub fn outbound_frame(skb: &SkBuff) -> Result<Vec<u8>> {
    let (header, data) = NlMsgHdr::parse(skb.data()).context("outbound buffer has no netlink header")?;
    anyhow::ensure!(header.nlmsg_type == NLMSG_DONE, "unexpected type {}", header.nlmsg_type);
    anyhow::ensure!(header.nlmsg_pid == 0, "kernel frames carry pid 0");
    anyhow::ensure!(skb.cb.portid == 0, "kernel frames carry portid 0");
    Ok(data.to_vec())
}

/// One recorded handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub sender: u32,
    pub payload: Vec<u8>,
}

/// Handler that records every invocation.
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl ServiceHandler for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn handle(&self, skb: &SkBuff, header: &NlMsgHdr, payload: &[u8]) {
        assert_eq!(header.payload_len(), payload.len() + 1);
        self.calls.lock().unwrap().push(Call {
            sender: skb.cb.portid,
            payload: payload.to_vec(),
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

/// The startup state matches the reference module: protocol 30, default
/// service on type 0, nothing else bound.
#[test]
fn test_startup_state() {
    let (transport, mux) = mux();
    assert!(transport.has_input());
    assert_eq!(mux.protocol(), 30);
    assert_eq!(mux.registry().bound_types(), vec![ServiceType(0)]);
    assert!(transport.sent().is_empty());
}

/// Dropping the mux releases the transport's input.
#[test]
fn test_shutdown_unbinds() {
    let (transport, mux) = mux();
    drop(mux);
    assert!(!transport.has_input());
    assert!(!transport.inject(raw_message(&[0, 1]), 9));
}
