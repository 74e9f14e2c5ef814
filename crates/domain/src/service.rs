//! Service — a command issued to a host entity.
//!
//! A controllable switch only ever needs `turn_on` and `turn_off`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Host service invoked on the target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    TurnOn,
    TurnOff,
}

impl Service {
    /// The service matching a desired on/off state.
    #[must_use]
    pub fn for_state(on: bool) -> Self {
        if on { Self::TurnOn } else { Self::TurnOff }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service call directed at one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub service: Service,
    pub entity_id: EntityId,
}

impl ServiceCall {
    #[must_use]
    pub fn new(service: Service, entity_id: EntityId) -> Self {
        Self { service, entity_id }
    }
}
