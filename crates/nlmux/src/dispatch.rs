//! Routes incoming netlink messages to services by their service type byte.

use std::sync::Arc;

use nlmux_core::wire::{decode_frame, NlMsgHdr, NETLINK_DEFAULT};
use nlmux_core::{ServiceType, SkBuff, WireError};
use nlmux_services::ServiceRegistry;

use crate::transport::NetlinkInput;

/// Why an inbound buffer reached no service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("bad netlink envelope: {0}")]
    Envelope(WireError),

    #[error("no netlink message: {0}")]
    Malformed(WireError),

    #[error("unknown service message: service type {0}")]
    UnknownServiceType(ServiceType),
}

/// The transport's receive callback.
///
/// Stateless apart from the registry it reads. Handlers run synchronously
/// on whatever context delivered the buffer.
pub struct InboundDispatcher {
    registry: Arc<ServiceRegistry>,
    protocol: i32,
}

impl InboundDispatcher {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self::with_protocol(registry, NETLINK_DEFAULT)
    }

    /// `protocol` only labels log lines.
    pub fn with_protocol(registry: Arc<ServiceRegistry>, protocol: i32) -> Self {
        Self { registry, protocol }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Route the first netlink message in `skb` to its service.
    ///
    /// Returns the service type that handled it. Only the length field of
    /// the netlink header is interpreted; the rest is passed through to
    /// the handler.
    pub fn dispatch(&self, skb: &SkBuff) -> Result<ServiceType, DispatchError> {
        let (header, data) = NlMsgHdr::parse(skb.data()).map_err(DispatchError::Envelope)?;
        let (ty, inner) = decode_frame(data).map_err(DispatchError::Malformed)?;

        let handler = self
            .registry
            .lookup(ty)
            .ok_or(DispatchError::UnknownServiceType(ty))?;

        tracing::debug!(
            protocol = self.protocol,
            service_type = ty.0,
            handler = handler.name(),
            sender = skb.cb.portid,
            payload_len = inner.len(),
            "dispatching service message"
        );
        handler.handle(skb, &header, inner);
        Ok(ty)
    }
}

impl NetlinkInput for InboundDispatcher {
    fn input(&self, skb: &SkBuff) {
        if let Err(e) = self.dispatch(skb) {
            match e {
                DispatchError::UnknownServiceType(ty) => tracing::error!(
                    protocol = self.protocol,
                    service_type = ty.0,
                    sender = skb.cb.portid,
                    "received an unknown service message"
                ),
                other => tracing::error!(
                    protocol = self.protocol,
                    sender = skb.cb.portid,
                    len = skb.len(),
                    error = %other,
                    "dropping netlink message"
                ),
            }
        }
    }
}
