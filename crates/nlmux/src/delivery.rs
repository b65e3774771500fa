//! Delivery: frame, wrap in a netlink message, send to a port or group.
//!
//! Everything funnels into [`Deliverer::deliver`]. The other entry points
//! pin the service type to the configured default, the destination to the
//! configured default port/group, or both.

use std::sync::Arc;

use zerocopy::AsBytes;

use nlmux_core::config::NlmuxConfig;
use nlmux_core::wire::{encode_frame_into, nlmsg_total_size, NlMsgHdr};
use nlmux_core::{Destination, ServiceType, WireError};

use crate::transport::NetlinkTransport;

/// Fallbacks for callers that omit the service type or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryDefaults {
    pub port: u32,
    pub group: u32,
    pub send_type: ServiceType,
}

impl DeliveryDefaults {
    pub fn from_config(config: &NlmuxConfig) -> Self {
        Self {
            port: config.netlink.default_port,
            group: config.netlink.default_group,
            send_type: config.services.default_send_type,
        }
    }
}

impl Default for DeliveryDefaults {
    fn default() -> Self {
        Self::from_config(&NlmuxConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport could not allocate a {size}-byte buffer")]
    AllocationFailed { size: usize },

    #[error("transport rejected the message: status {0}")]
    TransportRejected(i32),

    #[error("cannot frame payload: {0}")]
    Frame(#[from] WireError),
}

#[derive(Clone)]
pub struct Deliverer {
    transport: Arc<dyn NetlinkTransport>,
    defaults: DeliveryDefaults,
}

impl Deliverer {
    pub fn new(transport: Arc<dyn NetlinkTransport>, defaults: DeliveryDefaults) -> Self {
        Self { transport, defaults }
    }

    pub fn defaults(&self) -> DeliveryDefaults {
        self.defaults
    }

    /// Send `payload` tagged with `ty` to `destination`.
    pub fn deliver(
        &self,
        payload: &[u8],
        ty: ServiceType,
        destination: Destination,
    ) -> Result<(), DeliveryError> {
        let frame_len = payload.len() + 1;
        let header = NlMsgHdr::for_frame(frame_len).map_err(|e| {
            tracing::error!(frame_len, service_type = ty.0, %destination, "payload too large for a netlink message");
            DeliveryError::from(e)
        })?;
        let size = nlmsg_total_size(frame_len);

        let mut skb = self
            .transport
            .alloc(size)
            .filter(|skb| skb.capacity() >= size)
            .ok_or_else(|| {
                tracing::error!(size, service_type = ty.0, %destination, "failed to allocate netlink buffer");
                DeliveryError::AllocationFailed { size }
            })?;

        skb.put_slice(header.as_bytes());
        encode_frame_into(ty, payload, skb.tail_mut());
        skb.put_zeroes(size - skb.len());

        // Kernel-originated: no source port.
        skb.cb.portid = 0;
        skb.cb.dst_group = match destination {
            Destination::Group(group) => group,
            Destination::Port(_) => 0,
        };
        let skb = skb.freeze();

        let sent = match destination {
            Destination::Port(port) => self.transport.unicast(skb, port),
            Destination::Group(group) => self.transport.broadcast(skb, group),
        };

        match sent {
            Ok(()) => {
                tracing::trace!(service_type = ty.0, %destination, payload_len = payload.len(), "frame sent");
                Ok(())
            }
            Err(code) => {
                tracing::error!(service_type = ty.0, %destination, code, "error while sending a frame");
                Err(DeliveryError::TransportRejected(code))
            }
        }
    }

    // ── Unicast ──────────────────────────────────────────────────────────────

    /// Default service type to `port`.
    pub fn send_unicast(&self, payload: &[u8], port: u32) -> Result<(), DeliveryError> {
        self.deliver(payload, self.defaults.send_type, Destination::Port(port))
    }

    pub fn send_unicast_typed(
        &self,
        payload: &[u8],
        ty: ServiceType,
        port: u32,
    ) -> Result<(), DeliveryError> {
        self.deliver(payload, ty, Destination::Port(port))
    }

    /// Default service type to the default port.
    pub fn unicast(&self, payload: &[u8]) -> Result<(), DeliveryError> {
        self.send_unicast(payload, self.defaults.port)
    }

    /// `ty` to the default port.
    pub fn unicast_service(&self, payload: &[u8], ty: ServiceType) -> Result<(), DeliveryError> {
        self.send_unicast_typed(payload, ty, self.defaults.port)
    }

    // ── Broadcast ────────────────────────────────────────────────────────────

    /// Default service type to `group`.
    ///
    /// Takes the payload first and the group second, the same order as
    /// [`send_unicast`](Self::send_unicast).
    pub fn send_broadcast(&self, payload: &[u8], group: u32) -> Result<(), DeliveryError> {
        self.deliver(payload, self.defaults.send_type, Destination::Group(group))
    }

    pub fn send_broadcast_typed(
        &self,
        payload: &[u8],
        ty: ServiceType,
        group: u32,
    ) -> Result<(), DeliveryError> {
        self.deliver(payload, ty, Destination::Group(group))
    }

    /// Default service type to the default group.
    pub fn broadcast(&self, payload: &[u8]) -> Result<(), DeliveryError> {
        self.send_broadcast(payload, self.defaults.group)
    }

    /// `ty` to the default group.
    pub fn broadcast_service(&self, payload: &[u8], ty: ServiceType) -> Result<(), DeliveryError> {
        self.send_broadcast_typed(payload, ty, self.defaults.group)
    }
}
