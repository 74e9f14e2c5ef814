//! Application services — use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod config_flow;
pub mod entry_service;

pub use config_flow::ConfigFlow;
pub use entry_service::{EntryService, SetupOutcome};
