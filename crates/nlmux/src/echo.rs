//! Echo service: sends each payload straight back to the port it came from.
//!
//! Useful as a liveness check for user-space peers: send a frame on the
//! echo type, expect the same bytes back on the reply type.

use nlmux_core::{NlMsgHdr, ServiceType, SkBuff};
use nlmux_services::ServiceHandler;

use crate::delivery::Deliverer;

pub struct EchoService {
    deliverer: Deliverer,
    reply_type: ServiceType,
}

impl EchoService {
    pub fn new(deliverer: Deliverer, reply_type: ServiceType) -> Self {
        Self {
            deliverer,
            reply_type,
        }
    }
}

impl ServiceHandler for EchoService {
    fn name(&self) -> &str {
        "echo"
    }

    fn handle(&self, skb: &SkBuff, _header: &NlMsgHdr, payload: &[u8]) {
        let port = skb.cb.portid;
        if let Err(e) = self.deliverer.send_unicast_typed(payload, self.reply_type, port) {
            tracing::warn!(port, error = %e, "echo reply failed");
        }
    }
}
