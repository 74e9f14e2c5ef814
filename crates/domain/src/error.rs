//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`ControllableError`] via `#[from]`. Adapters box their own failures into
//! [`ControllableError::Host`].

use std::time::Duration;

use crate::entity::EntityId;
use crate::id::{ConfigEntryId, DeviceId};
use crate::service::Service;

/// Top-level error returned by ports and use-cases.
#[derive(Debug, thiserror::Error)]
pub enum ControllableError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("target resolution failed")]
    Resolution(#[from] ResolutionError),

    #[error("service dispatch failed")]
    Dispatch(#[from] DispatchError),

    /// Opaque failure reported by a host adapter.
    #[error("host error")]
    Host(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invariant violations on configuration entries and identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("invalid entity id {0:?}, expected `<domain>.<object_id>`")]
    InvalidEntityId(String),

    #[error("device {0} does not exist or exposes no switch, light or fan")]
    InvalidDevice(DeviceId),

    #[error("entity {0} is not an existing switch, light or fan")]
    InvalidTarget(EntityId),

    #[error("unsupported configuration entry version {0}")]
    UnsupportedVersion(u32),
}

/// A lookup by identifier returned nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

impl NotFoundError {
    /// Shorthand for a missing configuration entry.
    #[must_use]
    pub fn config_entry(id: ConfigEntryId) -> Self {
        Self {
            entity: "ConfigEntry",
            id: id.to_string(),
        }
    }
}

/// The switch has no usable target entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("no controllable entity found on device {0}")]
    NoControllableEntity(DeviceId),

    #[error("entity {0} is not a switch, light or fan")]
    UnsupportedDomain(EntityId),

    #[error("switch {0} has no target entity")]
    Unresolved(String),
}

/// The host could not carry out a `turn_on` / `turn_off` call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("{service} on {entity_id} rejected: {reason}")]
    Rejected {
        service: Service,
        entity_id: EntityId,
        reason: String,
    },

    #[error("{service} on {entity_id} timed out after {after:?}")]
    TimedOut {
        service: Service,
        entity_id: EntityId,
        after: Duration,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_with_from() {
        let err: ControllableError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            ControllableError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_display_not_found_error() {
        let id = ConfigEntryId::new();
        let err = NotFoundError::config_entry(id);
        assert_eq!(err.to_string(), format!("ConfigEntry {id} not found"));
    }

    #[test]
    fn should_display_resolution_error_with_device() {
        let device = DeviceId::new();
        let err = ResolutionError::NoControllableEntity(device);
        assert_eq!(
            err.to_string(),
            format!("no controllable entity found on device {device}")
        );
    }

    #[test]
    fn should_display_rejected_dispatch() {
        let err = DispatchError::Rejected {
            service: Service::TurnOff,
            entity_id: EntityId::parse("light.kitchen").unwrap(),
            reason: "device offline".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "turn_off on light.kitchen rejected: device offline"
        );
    }
}
