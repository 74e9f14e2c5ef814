//! Configuration entry — one user-created controllable switch.
//!
//! Two shapes exist. Version 2 (canonical) names the target entity directly;
//! version 1 names a device and is migrated once, at setup, by resolving the
//! device's first controllable entity.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{ControllableError, ValidationError};
use crate::id::{ConfigEntryId, DeviceId};

/// Version of entries that name their target entity.
pub const CURRENT_VERSION: u32 = 2;
/// Version of entries that name a device and still need resolution.
pub const DEVICE_VERSION: u32 = 1;

/// What the switch should control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    #[serde(rename = "target_entity")]
    Entity(EntityId),
    #[serde(rename = "target_device")]
    Device(DeviceId),
}

/// User-supplied entry data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    pub name: String,
    #[serde(flatten)]
    pub target: Target,
}

/// A configuration entry as stored by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub entry_id: ConfigEntryId,
    pub version: u32,
    pub title: String,
    pub data: EntryData,
}

impl ConfigEntry {
    /// Create an entry with a fresh id, versioned after its target shape.
    #[must_use]
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        let name = name.into();
        let version = match target {
            Target::Entity(_) => CURRENT_VERSION,
            Target::Device(_) => DEVICE_VERSION,
        };
        Self {
            entry_id: ConfigEntryId::new(),
            version,
            title: name.clone(),
            data: EntryData { name, target },
        }
    }

    #[must_use]
    pub fn with_entry_id(mut self, entry_id: ConfigEntryId) -> Self {
        self.entry_id = entry_id;
        self
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ControllableError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - the version does not match the target shape
    ///   ([`ValidationError::UnsupportedVersion`])
    pub fn validate(&self) -> Result<(), ControllableError> {
        if self.data.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        match (self.version, &self.data.target) {
            (CURRENT_VERSION, Target::Entity(_)) | (DEVICE_VERSION, Target::Device(_)) => Ok(()),
            (version, _) => Err(ValidationError::UnsupportedVersion(version).into()),
        }
    }

    /// Whether this entry still names a device instead of an entity.
    #[must_use]
    pub fn needs_migration(&self) -> bool {
        matches!(self.data.target, Target::Device(_))
    }

    /// Rewrite a device-based entry into the canonical entity-based shape.
    #[must_use]
    pub fn migrated(mut self, entity_id: EntityId) -> Self {
        self.data.target = Target::Entity(entity_id);
        self.version = CURRENT_VERSION;
        self
    }

    /// The target entity, when the entry is in canonical shape.
    #[must_use]
    pub fn target_entity(&self) -> Option<&EntityId> {
        match &self.data.target {
            Target::Entity(id) => Some(id),
            Target::Device(_) => None,
        }
    }
}
