//! Event — an immutable record of something that happened on the bus.
//!
//! The host fires raw [`EventKind::StateChanged`] events for every entity.
//! The change-detection listener republishes the scoped
//! [`EventKind::TargetChanged`] for configured targets only, and every switch
//! announces its new state with [`EventKind::SwitchUpdated`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityState};
use crate::id::EventId;
use crate::switch::SwitchSnapshot;

pub const EVENT_STATE_CHANGED: &str = "state_changed";
pub const EVENT_TARGET_CHANGED: &str = "controllable_target_changed";
pub const EVENT_SWITCH_UPDATED: &str = "controllable_switch_updated";

/// UTC time an event was fired.
pub type Timestamp = DateTime<Utc>;

/// A single event carried by the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub fired_at: Timestamp,
    pub kind: EventKind,
}

/// Typed event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data")]
pub enum EventKind {
    #[serde(rename = "state_changed")]
    StateChanged {
        entity_id: EntityId,
        old_state: Option<EntityState>,
        new_state: Option<EntityState>,
    },
    #[serde(rename = "controllable_target_changed")]
    TargetChanged { entity_id: EntityId },
    #[serde(rename = "controllable_switch_updated")]
    SwitchUpdated { snapshot: SwitchSnapshot },
}

impl Event {
    /// Create a new event stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            id: EventId::new(),
            fired_at: Utc::now(),
            kind,
        }
    }

    #[must_use]
    pub fn state_changed(
        entity_id: EntityId,
        old_state: Option<EntityState>,
        new_state: Option<EntityState>,
    ) -> Self {
        Self::new(EventKind::StateChanged {
            entity_id,
            old_state,
            new_state,
        })
    }

    #[must_use]
    pub fn target_changed(entity_id: EntityId) -> Self {
        Self::new(EventKind::TargetChanged { entity_id })
    }

    #[must_use]
    pub fn switch_updated(snapshot: SwitchSnapshot) -> Self {
        Self::new(EventKind::SwitchUpdated { snapshot })
    }

    /// Wire name of the event type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.kind {
            EventKind::StateChanged { .. } => EVENT_STATE_CHANGED,
            EventKind::TargetChanged { .. } => EVENT_TARGET_CHANGED,
            EventKind::SwitchUpdated { .. } => EVENT_SWITCH_UPDATED,
        }
    }
}
