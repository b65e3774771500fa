//! nlmux: many services over one netlink protocol channel.
//!
//! Outbound, a producer calls a [`Deliverer`] entry point; the payload is
//! tagged with its service type, wrapped in a netlink message, and sent to
//! a port or a multicast group. Inbound, the transport calls the
//! [`InboundDispatcher`], which strips the netlink header and the tag and
//! hands the payload to the service registered for that type.
//!
//! [`NetlinkMux`] wires the two halves to a transport.

pub mod delivery;
pub mod dispatch;
pub mod echo;
pub mod loopback;
pub mod transport;

use std::sync::Arc;

use nlmux_core::config::NlmuxConfig;
use nlmux_core::ServiceType;
use nlmux_services::{DefaultService, ServiceHandler, ServiceRegistry};

pub use delivery::{Deliverer, DeliveryDefaults, DeliveryError};
pub use dispatch::{DispatchError, InboundDispatcher};
pub use echo::EchoService;
pub use loopback::LoopbackTransport;
pub use transport::{NetlinkInput, NetlinkTransport, TransportError};

/// A transport with the dispatcher bound and a deliverer ready to use.
pub struct NetlinkMux {
    transport: Arc<dyn NetlinkTransport>,
    registry: Arc<ServiceRegistry>,
    deliverer: Deliverer,
    protocol: i32,
}

impl NetlinkMux {
    /// Bind a fresh registry and dispatcher to `transport`.
    ///
    /// The built-in services enabled in `config` are registered before the
    /// dispatcher is bound, so the first inbound message already sees them.
    pub fn new(
        transport: Arc<dyn NetlinkTransport>,
        config: &NlmuxConfig,
    ) -> Result<Self, TransportError> {
        let protocol = config.netlink.protocol;
        let registry = Arc::new(ServiceRegistry::new());
        let deliverer = Deliverer::new(transport.clone(), DeliveryDefaults::from_config(config));

        if config.services.default_handler {
            registry.register(config.services.default_recv_type, Arc::new(DefaultService::new()));
        }
        if config.services.echo {
            registry.register(
                config.services.echo_type,
                Arc::new(EchoService::new(deliverer.clone(), config.services.echo_reply_type)),
            );
        }

        let dispatcher = InboundDispatcher::with_protocol(registry.clone(), protocol);
        transport.bind_input(Arc::new(dispatcher))?;

        tracing::info!(
            protocol,
            services = registry.bound_types().len(),
            "netlink mux loaded"
        );

        Ok(Self {
            transport,
            registry,
            deliverer,
            protocol,
        })
    }

    /// [`new`](Self::new) with the configuration found on this host.
    ///
    /// Writes the default config file if none exists yet. A file that
    /// cannot be read or parsed is logged and the defaults are used.
    pub fn from_env(transport: Arc<dyn NetlinkTransport>) -> Result<Self, TransportError> {
        if let Err(e) = NlmuxConfig::write_default_if_missing() {
            tracing::warn!(error = %e, "failed to write default config");
        }
        let config = NlmuxConfig::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            NlmuxConfig::default()
        });
        Self::new(transport, &config)
    }

    /// Bind `handler` to `ty`. Replaces any earlier handler for `ty`.
    pub fn register_handler(&self, ty: ServiceType, handler: Arc<dyn ServiceHandler>) {
        self.registry.register(ty, handler);
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn deliverer(&self) -> &Deliverer {
        &self.deliverer
    }

    pub fn protocol(&self) -> i32 {
        self.protocol
    }
}

impl Drop for NetlinkMux {
    fn drop(&mut self) {
        tracing::info!(protocol = self.protocol, "netlink mux unloading");
        // Services may hold the transport; unbinding breaks the cycle.
        self.transport.unbind_input();
    }
}
