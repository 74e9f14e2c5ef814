//! Controllable switch state — believed on/off value and sync status.
//!
//! [`SyncState`] is the only place where `synced` is written. It is always
//! the result of [`is_synced`] applied to the believed state and the latest
//! target reading, never set on its own.

use serde::{Deserialize, Serialize};

use crate::device::DeviceLink;
use crate::entity::EntityId;
use crate::id::ConfigEntryId;

/// State attribute carrying the sync flag.
pub const ATTR_IS_SYNCED: &str = "is_synced";
/// State attribute carrying the controlled entity id.
pub const ATTR_TARGET_ENTITY: &str = "target_entity";

/// Whether a believed state matches a target reading.
///
/// A missing reading (target unknown or unavailable) is never synced.
#[must_use]
pub fn is_synced(believed_on: bool, reading: Option<bool>) -> bool {
    reading == Some(believed_on)
}

/// The `(believed_on, synced)` pair owned by one switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    believed_on: bool,
    synced: bool,
}

impl SyncState {
    /// Seed from the target reading taken when the switch is created.
    ///
    /// The believed state follows the reading, or `false` without one. A
    /// switch seeded from a real reading is synced; without a reading it is
    /// synced only when `assume_synced_when_unavailable` is set.
    #[must_use]
    pub fn seed(reading: Option<bool>, assume_synced_when_unavailable: bool) -> Self {
        Self {
            believed_on: reading.unwrap_or(false),
            synced: reading.is_some() || assume_synced_when_unavailable,
        }
    }

    /// State of a switch whose target could not be resolved.
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            believed_on: false,
            synced: false,
        }
    }

    /// Record an explicit on/off command. Does not touch `synced`.
    pub fn command(&mut self, on: bool) {
        self.believed_on = on;
    }

    /// Recompute `synced` against a fresh reading. Returns `true` when the
    /// flag changed.
    pub fn reconcile(&mut self, reading: Option<bool>) -> bool {
        let synced = is_synced(self.believed_on, reading);
        let changed = synced != self.synced;
        self.synced = synced;
        changed
    }

    #[must_use]
    pub fn believed_on(self) -> bool {
        self.believed_on
    }

    #[must_use]
    pub fn synced(self) -> bool {
        self.synced
    }
}

/// Externally visible state of a controllable switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSnapshot {
    pub unique_id: String,
    pub entry_id: ConfigEntryId,
    pub name: String,
    pub is_on: bool,
    pub is_synced: bool,
    pub target_entity: Option<EntityId>,
    pub device: Option<DeviceLink>,
}

impl SwitchSnapshot {
    /// Device class reported to the host.
    pub const DEVICE_CLASS: &'static str = "switch";

    /// Extra state attributes exposed alongside the on/off state.
    #[must_use]
    pub fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut attributes = serde_json::Map::with_capacity(2);
        attributes.insert(ATTR_IS_SYNCED.to_string(), self.is_synced.into());
        attributes.insert(
            ATTR_TARGET_ENTITY.to_string(),
            self.target_entity
                .as_ref()
                .map_or(serde_json::Value::Null, |id| id.as_str().into()),
        );
        attributes
    }
}

/// Unique id of a switch: `"{entry_id}_{name}"`.
#[must_use]
pub fn unique_id(entry_id: ConfigEntryId, name: &str) -> String {
    format!("{entry_id}_{name}")
}
