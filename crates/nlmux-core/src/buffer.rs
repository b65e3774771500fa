//! Socket buffers: the unit the netlink transport moves around.
//!
//! `SkBuffMut` is what a sender fills in; `SkBuff` is the frozen,
//! cheaply clonable form that transports send and receivers read.

use bytes::{BufMut, Bytes, BytesMut};

/// Netlink control block: the routing metadata carried beside the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetlinkCb {
    /// Port id of the sender. Zero when the message originates in-kernel.
    pub portid: u32,
    /// Destination multicast group. Zero for unicast.
    pub dst_group: u32,
}

/// A received or ready-to-send netlink buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkBuff {
    pub cb: NetlinkCb,
    data: Bytes,
}

impl SkBuff {
    pub fn new(data: impl Into<Bytes>, cb: NetlinkCb) -> Self {
        Self {
            cb,
            data: data.into(),
        }
    }

    /// Raw bytes, netlink header first.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A fixed-capacity buffer under construction.
///
/// Writing past the capacity the transport allocated is a caller bug and
/// panics, like `skb_put` running off the tail.
#[derive(Debug)]
pub struct SkBuffMut {
    pub cb: NetlinkCb,
    data: BytesMut,
    capacity: usize,
}

impl SkBuffMut {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cb: NetlinkCb::default(),
            data: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes still available before the capacity is reached.
    pub fn tailroom(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Append `bytes` to the tail.
    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.check_room(bytes.len());
        self.data.put_slice(bytes);
    }

    /// Append `count` zero bytes to the tail.
    pub fn put_zeroes(&mut self, count: usize) {
        self.check_room(count);
        self.data.put_bytes(0, count);
    }

    /// Direct access to the underlying buffer, for encoders that write
    /// into a `BytesMut`. Capacity is checked again on `freeze`.
    pub fn tail_mut(&mut self) -> &mut BytesMut {
        &mut self.data
    }

    pub fn freeze(self) -> SkBuff {
        self.check_room(0);
        SkBuff {
            cb: self.cb,
            data: self.data.freeze(),
        }
    }

    fn check_room(&self, wanted: usize) {
        assert!(
            self.data.len() + wanted <= self.capacity,
            "skb overflow: len {} + {} exceeds capacity {}",
            self.data.len(),
            wanted,
            self.capacity
        );
    }
}
