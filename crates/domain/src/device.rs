//! Device — a physical or virtual thing registered with the host that exposes
//! one or more entities.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ControllableError, ValidationError};
use crate::id::DeviceId;

/// `(namespace, value)` pair such as `("zigbee", "0x00158d0001")`.
pub type DeviceKey = (String, String);

/// A device as known by the host device registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub identifiers: BTreeSet<DeviceKey>,
    pub connections: BTreeSet<DeviceKey>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ControllableError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), ControllableError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// The identity used to attach another entity to this device.
    #[must_use]
    pub fn link(&self) -> DeviceLink {
        DeviceLink {
            device_id: self.id,
            identifiers: self.identifiers.clone(),
            connections: self.connections.clone(),
        }
    }
}

/// Device association carried by a controllable switch so the host groups it
/// with its target's device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceLink {
    pub device_id: DeviceId,
    pub identifiers: BTreeSet<DeviceKey>,
    pub connections: BTreeSet<DeviceKey>,
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    identifiers: BTreeSet<DeviceKey>,
    connections: BTreeSet<DeviceKey>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn identifier(mut self, namespace: impl Into<String>, value: impl Into<String>) -> Self {
        self.identifiers.insert((namespace.into(), value.into()));
        self
    }

    #[must_use]
    pub fn connection(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.connections.insert((kind.into(), value.into()));
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`ControllableError::Validation`] if `name` is missing or empty.
    pub fn build(self) -> Result<Device, ControllableError> {
        let device = Device {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            identifiers: self.identifiers,
            connections: self.connections,
        };
        device.validate()?;
        Ok(device)
    }
}
