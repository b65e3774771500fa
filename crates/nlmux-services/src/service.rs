//! Handler trait for netlink services.
//!
//! A service owns one service type on the shared netlink channel. The
//! dispatcher strips the netlink header and the type byte, then hands the
//! rest to the service bound to that type.

use nlmux_core::{NlMsgHdr, SkBuff};

/// Trait for services that consume frames of one service type.
///
/// Called synchronously on the transport's receive path, so
/// implementations must not block for long. There is no return value:
/// a service deals with its own failures (log, reply, or drop).
pub trait ServiceHandler: Send + Sync {
    /// Short name used in log fields.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Handle one inbound frame.
    ///
    /// `skb` is the raw buffer as received (sender port in `skb.cb`),
    /// `header` its parsed netlink header, and `payload` the frame with
    /// the service type byte already removed.
    fn handle(&self, skb: &SkBuff, header: &NlMsgHdr, payload: &[u8]);
}

/// Closures with the handler signature are services too.
impl<F> ServiceHandler for F
where
    F: Fn(&SkBuff, &NlMsgHdr, &[u8]) + Send + Sync,
{
    fn handle(&self, skb: &SkBuff, header: &NlMsgHdr, payload: &[u8]) {
        self(skb, header, payload)
    }
}
