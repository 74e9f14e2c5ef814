//! # controllable-domain
//!
//! Pure domain model for controllable switches: virtual on/off switches that
//! drive one host entity and track whether it still matches what they last
//! commanded.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers and error conventions
//! - Host-facing vocabulary: **entity ids**, **entity states**, **devices**,
//!   **services** (`turn_on`, `turn_off`) and bus **events**
//! - **Configuration entries** and their versioned shapes
//! - The **sync state** of a switch and the pure function that decides it
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod config_entry;
pub mod device;
pub mod diagnostics;
pub mod entity;
pub mod event;
pub mod service;
pub mod switch;

/// Integration domain; prefixes the scoped bus events.
pub const DOMAIN: &str = "controllable";
