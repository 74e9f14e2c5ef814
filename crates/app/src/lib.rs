//! # controllable-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** the host must implement (driven/outbound ports):
//!   - `EntityRegistry` / `DeviceRegistry` — registry lookups
//!   - `StateStore` — current state of an entity
//!   - `ServiceDispatcher` — `turn_on` / `turn_off` calls
//!   - `EventPublisher` / `EventSubscriber` — the event bus
//! - Provide the use cases:
//!   - `TargetResolver` — device or entity to target entity
//!   - `ControllableSwitch` — believed state and sync reconciliation
//!   - `TargetChangeListener` — scoped change notifications
//!   - `EntryService` — entry setup, unload, migration and diagnostics
//!   - `ConfigFlow` — validation of user input
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `controllable-domain` only (plus `tokio` for channels, tasks
//! and timers). Never imports adapter crates. Adapters depend on *this*
//! crate, not the reverse.

pub mod change_listener;
pub mod event_bus;
pub mod ports;
pub mod registrar;
pub mod resolver;
pub mod services;
pub mod switch;

#[cfg(test)]
mod test_support;
