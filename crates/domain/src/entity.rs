//! Entity identifiers and registry entries.
//!
//! An entity is a single observable/controllable aspect of a device owned by
//! the host platform. The core only ever refers to entities by their
//! `<domain>.<object_id>` identifier; the domain prefix decides whether an
//! entity can be controlled by a controllable switch.

mod state;

pub use state::EntityState;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceId;

/// Host entity identifier such as `light.kitchen`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Parse and validate an entity identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEntityId`] unless the value has the
    /// shape `<domain>.<object_id>` with both parts non-empty.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        match value.split_once('.') {
            Some((domain, object_id))
                if !domain.is_empty() && !object_id.is_empty() && !domain.contains(' ') =>
            {
                Ok(Self(value))
            }
            _ => Err(ValidationError::InvalidEntityId(value)),
        }
    }

    /// The domain prefix (`light` for `light.kitchen`).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('.').map_or(self.0.as_str(), |(d, _)| d)
    }

    /// The controllable domain of this entity, if it has one.
    #[must_use]
    pub fn controllable_domain(&self) -> Option<ControllableDomain> {
        self.domain().parse().ok()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Entity domains that accept `turn_on` / `turn_off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllableDomain {
    Switch,
    Light,
    Fan,
}

impl ControllableDomain {
    pub const ALL: [Self; 3] = [Self::Switch, Self::Light, Self::Fan];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Switch => "switch",
            Self::Light => "light",
            Self::Fan => "fan",
        }
    }
}

impl fmt::Display for ControllableDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a domain string is not one of `switch`, `light`, `fan`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("domain {0:?} is not controllable")]
pub struct UnsupportedDomain(pub String);

impl FromStr for ControllableDomain {
    type Err = UnsupportedDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| UnsupportedDomain(s.to_string()))
    }
}

/// One row of the host entity registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub entity_id: EntityId,
    pub device_id: Option<DeviceId>,
}

impl RegistryEntry {
    #[must_use]
    pub fn new(entity_id: EntityId, device_id: Option<DeviceId>) -> Self {
        Self {
            entity_id,
            device_id,
        }
    }

    /// Whether this entry can be the target of a controllable switch.
    #[must_use]
    pub fn is_controllable(&self) -> bool {
        self.entity_id.controllable_domain().is_some()
    }
}
