//! In-memory host error types.

use controllable_domain::entity::EntityId;
use controllable_domain::error::ControllableError;
use controllable_domain::id::DeviceId;

/// Errors specific to the in-memory host.
#[derive(Debug, thiserror::Error)]
pub enum MemoryHostError {
    /// The entity is not in the registry.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// The entity is already registered.
    #[error("entity {0} is already registered")]
    DuplicateEntity(EntityId),

    /// An entity refers to a device that was never added.
    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    /// A domain-level error (validation, not-found, etc.).
    #[error("domain error")]
    Domain(#[source] ControllableError),
}

impl MemoryHostError {
    /// Convert into a [`ControllableError::Host`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> ControllableError {
        match self {
            Self::Domain(err) => err,
            other => ControllableError::Host(Box::new(other)),
        }
    }
}

impl From<MemoryHostError> for ControllableError {
    fn from(err: MemoryHostError) -> Self {
        err.into_domain()
    }
}

impl From<ControllableError> for MemoryHostError {
    fn from(err: ControllableError) -> Self {
        Self::Domain(err)
    }
}
