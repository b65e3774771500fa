//! Default service: catches frames sent with the unclassified service type.
//!
//! Does nothing beyond logging. Bound at startup so peers that never pick
//! a service type still land somewhere visible.

use nlmux_core::{NlMsgHdr, SkBuff};

use crate::service::ServiceHandler;

#[derive(Debug, Default)]
pub struct DefaultService;

impl DefaultService {
    pub fn new() -> Self {
        Self
    }
}

impl ServiceHandler for DefaultService {
    fn name(&self) -> &str {
        "default"
    }

    fn handle(&self, skb: &SkBuff, header: &NlMsgHdr, payload: &[u8]) {
        tracing::info!(
            sender = skb.cb.portid,
            seq = header.nlmsg_seq,
            payload_len = payload.len(),
            head = hex::encode(&payload[..payload.len().min(16)]),
            "received a default service message"
        );
    }
}
