//! nlmux wire format: the bytes that cross the netlink channel.
//!
//! Every message is one netlink message whose data is a service frame:
//!
//! ```text
//! +----------------------------+------------------+---------------------+---------+
//! | NlMsgHdr (16 bytes)        | service type (1) | payload (0..N)      | padding |
//! +----------------------------+------------------+---------------------+---------+
//! ```
//!
//! There is no length prefix inside the frame. `nlmsg_len` bounds it.
//! Header fields are host-endian, as netlink requires.

use std::fmt;

use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Netlink Header ───────────────────────────────────────────────────────────

/// Netlink message header (`struct nlmsghdr`).
///
/// Wire size: 16 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct NlMsgHdr {
    /// Length of the message including this header, excluding trailing padding.
    pub nlmsg_len: u32,
    /// Message type. Outbound service frames always carry `NLMSG_DONE`.
    pub nlmsg_type: u16,
    /// Additional flags. Zero on everything nlmux sends.
    pub nlmsg_flags: u16,
    /// Sequence number. Zero on everything nlmux sends.
    pub nlmsg_seq: u32,
    /// Sending port id. Zero for kernel-originated messages.
    pub nlmsg_pid: u32,
}

assert_eq_size!(NlMsgHdr, [u8; 16]);

impl NlMsgHdr {
    /// Header for an outbound service frame of `frame_len` bytes.
    ///
    /// Fails when the message length does not fit the 32-bit `nlmsg_len`.
    pub fn for_frame(frame_len: usize) -> Result<Self, WireError> {
        let nlmsg_len = frame_len
            .checked_add(NLMSG_HDRLEN)
            .and_then(|len| u32::try_from(len).ok())
            .ok_or(WireError::FrameTooLarge(frame_len))?;

        Ok(Self {
            nlmsg_len,
            nlmsg_type: NLMSG_DONE,
            nlmsg_flags: 0,
            nlmsg_seq: 0,
            nlmsg_pid: 0,
        })
    }

    /// Split a raw buffer into its header and the data the header covers.
    ///
    /// Trailing bytes past `nlmsg_len` (alignment padding or further
    /// messages) are not part of the returned slice.
    pub fn parse(buf: &[u8]) -> Result<(NlMsgHdr, &[u8]), WireError> {
        let header = NlMsgHdr::read_from_prefix(buf).ok_or(WireError::TruncatedHeader(buf.len()))?;

        let declared = header.nlmsg_len as usize;
        if declared < NLMSG_HDRLEN || declared > buf.len() {
            return Err(WireError::BadLength {
                declared,
                available: buf.len(),
            });
        }

        Ok((header, &buf[NLMSG_HDRLEN..declared]))
    }

    /// Number of data bytes this header declares.
    pub fn payload_len(&self) -> usize {
        (self.nlmsg_len as usize).saturating_sub(NLMSG_HDRLEN)
    }
}

/// Round `len` up to the netlink alignment boundary.
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// `nlmsg_len` value for a message carrying `payload` data bytes.
pub const fn nlmsg_length(payload: usize) -> usize {
    payload + NLMSG_HDRLEN
}

/// Buffer bytes needed for a message carrying `payload` data bytes, padding included.
pub const fn nlmsg_total_size(payload: usize) -> usize {
    nlmsg_align(nlmsg_length(payload))
}

// ── Service Type ─────────────────────────────────────────────────────────────

/// One-byte service identifier carried as the first byte of every frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceType(pub u8);

impl ServiceType {
    /// The default/unclassified service type.
    pub const DEFAULT: ServiceType = ServiceType(0);

    /// Slot index in a 256-entry table.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for ServiceType {
    fn from(value: u8) -> Self {
        ServiceType(value)
    }
}

impl From<ServiceType> for u8 {
    fn from(t: ServiceType) -> u8 {
        t.0
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Destination ──────────────────────────────────────────────────────────────

/// Where an outbound frame goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Unicast to a single netlink port id.
    Port(u32),
    /// Broadcast to every socket subscribed to a multicast group.
    Group(u32),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Port(p) => write!(f, "port:{p}"),
            Destination::Group(g) => write!(f, "group:{g}"),
        }
    }
}

// ── Frame Codec ──────────────────────────────────────────────────────────────

/// Tag `payload` with its service type.
pub fn encode_frame(ty: ServiceType, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.push(ty.0);
    frame.extend_from_slice(payload);
    frame
}

/// Same bytes as [`encode_frame`], appended to an existing buffer.
pub fn encode_frame_into(ty: ServiceType, payload: &[u8], out: &mut bytes::BytesMut) {
    out.reserve(payload.len() + 1);
    out.extend_from_slice(&[ty.0]);
    out.extend_from_slice(payload);
}

/// Split a frame into its service type and inner payload.
///
/// The inner payload may be empty. An empty frame has no type byte and is
/// rejected.
pub fn decode_frame(frame: &[u8]) -> Result<(ServiceType, &[u8]), WireError> {
    match frame.split_first() {
        Some((&ty, inner)) => Ok((ServiceType(ty), inner)),
        None => Err(WireError::MalformedFrame),
    }
}

// ── Constants ────────────────────────────────────────────────────────────────

/// Netlink protocol number the service channel is registered under.
pub const NETLINK_DEFAULT: i32 = 30;

/// Port id used when a unicast caller omits the destination.
pub const DEFAULT_PORT: u32 = 1;

/// Multicast group used when a broadcast caller omits the destination.
pub const DEFAULT_GROUP: u32 = 1;

/// Netlink message alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Aligned header length.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// `NLMSG_DONE` message type, used for every outbound service frame.
pub const NLMSG_DONE: u16 = 3;

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors that can arise when interpreting wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("malformed frame: missing service type byte")]
    MalformedFrame,

    #[error("buffer of {0} bytes is too short for a netlink header")]
    TruncatedHeader(usize),

    #[error("netlink header declares {declared} bytes, buffer holds {available}")]
    BadLength { declared: usize, available: usize },

    #[error("frame of {0} bytes does not fit in a netlink message")]
    FrameTooLarge(usize),
}

// ── Tests ────────────────────────────────────────────────────────────────────
