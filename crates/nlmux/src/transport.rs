//! The netlink socket as the multiplexer sees it.
//!
//! Socket creation and teardown live outside this crate. Whatever owns the
//! socket hands it in as a [`NetlinkTransport`], and the multiplexer binds
//! its dispatcher as the single [`NetlinkInput`].

use std::sync::Arc;

use nlmux_core::{SkBuff, SkBuffMut};

/// Send side and input binding of a kernel netlink socket.
///
/// Send primitives follow the netlink convention: a negative status code
/// on failure. Callers surface it, they do not retry.
pub trait NetlinkTransport: Send + Sync {
    /// Allocate an outbound buffer of `size` bytes. `None` under memory pressure.
    fn alloc(&self, size: usize) -> Option<SkBuffMut>;

    /// Send `skb` to a single port id.
    fn unicast(&self, skb: SkBuff, port: u32) -> Result<(), i32>;

    /// Send `skb` to every listener in `group`.
    fn broadcast(&self, skb: SkBuff, group: u32) -> Result<(), i32>;

    /// Install the receive callback. Exactly one may be bound.
    fn bind_input(&self, input: Arc<dyn NetlinkInput>) -> Result<(), TransportError>;

    /// Drop the bound callback, if any. Incoming buffers are discarded after this.
    fn unbind_input(&self);
}

/// Receive callback, invoked once per incoming raw buffer.
pub trait NetlinkInput: Send + Sync {
    fn input(&self, skb: &SkBuff);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("an input callback is already bound to this transport")]
    InputAlreadyBound,
}
