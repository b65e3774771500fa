//! nlmux-services: the service side of the netlink multiplexer.
//!
//! [`ServiceHandler`] is what a service implements, [`ServiceRegistry`]
//! is the table the dispatcher routes through, and [`DefaultService`]
//! is bound to the unclassified type out of the box.

pub mod default_service;
pub mod registry;
pub mod service;

pub use default_service::DefaultService;
pub use registry::{ServiceRegistry, SERVICE_SLOTS};
pub use service::ServiceHandler;
