//! In-memory transport.
//!
//! Records every outbound buffer instead of putting it on a socket, and
//! lets the caller push raw buffers into the bound input as if a peer had
//! sent them. Send status and allocation failure can be forced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use zerocopy::AsBytes;

use nlmux_core::wire::{encode_frame, nlmsg_align, NlMsgHdr};
use nlmux_core::{Destination, NetlinkCb, ServiceType, SkBuff, SkBuffMut};

use crate::transport::{NetlinkInput, NetlinkTransport, TransportError};

/// One buffer handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: Destination,
    pub skb: SkBuff,
}

pub struct LoopbackTransport {
    input: Mutex<Option<Arc<dyn NetlinkInput>>>,
    sent: Mutex<Vec<SentMessage>>,
    unicast_status: Mutex<Result<(), i32>>,
    broadcast_status: Mutex<Result<(), i32>>,
    alloc_fails: AtomicBool,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            input: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            unicast_status: Mutex::new(Ok(())),
            broadcast_status: Mutex::new(Ok(())),
            alloc_fails: AtomicBool::new(false),
        }
    }

    /// Status returned by every subsequent unicast.
    pub fn set_unicast_status(&self, status: Result<(), i32>) {
        *locked(&self.unicast_status) = status;
    }

    /// Status returned by every subsequent broadcast.
    pub fn set_broadcast_status(&self, status: Result<(), i32>) {
        *locked(&self.broadcast_status) = status;
    }

    pub fn set_alloc_fails(&self, fails: bool) {
        self.alloc_fails.store(fails, Ordering::Relaxed);
    }

    /// Buffers accepted so far, in send order.
    pub fn sent(&self) -> Vec<SentMessage> {
        locked(&self.sent).clone()
    }

    /// Drain and return the accepted buffers.
    pub fn take_sent(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *locked(&self.sent))
    }

    pub fn has_input(&self) -> bool {
        locked(&self.input).is_some()
    }

    /// Feed a raw buffer to the bound input as if `sender_port` sent it.
    ///
    /// Returns false when no input is bound and the buffer went nowhere.
    pub fn inject(&self, data: impl Into<bytes::Bytes>, sender_port: u32) -> bool {
        // Clone out so a handler that injects again does not deadlock.
        let Some(input) = locked(&self.input).clone() else {
            tracing::warn!(sender_port, "no input bound, dropping injected buffer");
            return false;
        };
        let skb = SkBuff::new(
            data,
            NetlinkCb {
                portid: sender_port,
                dst_group: 0,
            },
        );
        input.input(&skb);
        true
    }

    /// Wrap `ty`/`payload` in a frame and a netlink header, then [`inject`](Self::inject) it.
    pub fn inject_frame(&self, ty: ServiceType, payload: &[u8], sender_port: u32) -> bool {
        let frame = encode_frame(ty, payload);
        let mut header = match NlMsgHdr::for_frame(frame.len()) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!(sender_port, error = %e, "cannot wrap injected frame");
                return false;
            }
        };
        header.nlmsg_pid = sender_port;

        let mut buf = Vec::with_capacity(nlmsg_align(header.nlmsg_len as usize));
        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(&frame);
        buf.resize(nlmsg_align(buf.len()), 0);
        self.inject(buf, sender_port)
    }

    fn record(&self, skb: SkBuff, destination: Destination) {
        locked(&self.sent).push(SentMessage { destination, skb });
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NetlinkTransport for LoopbackTransport {
    fn alloc(&self, size: usize) -> Option<SkBuffMut> {
        if self.alloc_fails.load(Ordering::Relaxed) {
            return None;
        }
        Some(SkBuffMut::with_capacity(size))
    }

    fn unicast(&self, skb: SkBuff, port: u32) -> Result<(), i32> {
        let status = *locked(&self.unicast_status);
        if status.is_ok() {
            self.record(skb, Destination::Port(port));
        }
        status
    }

    fn broadcast(&self, skb: SkBuff, group: u32) -> Result<(), i32> {
        let status = *locked(&self.broadcast_status);
        if status.is_ok() {
            self.record(skb, Destination::Group(group));
        }
        status
    }

    fn bind_input(&self, input: Arc<dyn NetlinkInput>) -> Result<(), TransportError> {
        let mut slot = locked(&self.input);
        if slot.is_some() {
            return Err(TransportError::InputAlreadyBound);
        }
        *slot = Some(input);
        Ok(())
    }

    fn unbind_input(&self) {
        locked(&self.input).take();
    }
}
