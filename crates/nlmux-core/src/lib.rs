//! nlmux-core: wire format, socket buffers, and configuration.
//! The other nlmux crates depend on this one.

pub mod buffer;
pub mod config;
pub mod wire;

pub use buffer::{NetlinkCb, SkBuff, SkBuffMut};
pub use wire::{Destination, NlMsgHdr, ServiceType, WireError};
