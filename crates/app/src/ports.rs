//! Port definitions — traits that host adapters implement.
//!
//! Ports are the boundaries between the controllable core and the host
//! platform. They are defined here (in `app`) so that both the use-case layer
//! and the adapter layer can depend on them without creating circular
//! dependencies.

pub mod dispatcher;
pub mod event_bus;
pub mod registry;
pub mod state_store;

pub use dispatcher::ServiceDispatcher;
pub use event_bus::{EventPublisher, EventSubscriber};
pub use registry::{DeviceRegistry, EntityRegistry};
pub use state_store::StateStore;
