//! Entity state — the operational state reported by the host for an entity.

use serde::{Deserialize, Serialize};

/// Discrete operational state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    On,
    Off,
    #[default]
    Unknown,
    Unavailable,
}

impl EntityState {
    /// The on/off reading used for sync reconciliation.
    ///
    /// Only `on` and `off` are readings; `unknown` and `unavailable` carry no
    /// information about the target and yield `None`.
    #[must_use]
    pub fn reading(self) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            Self::Unknown | Self::Unavailable => None,
        }
    }

    #[must_use]
    pub fn from_on(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
            Self::Unknown => f.write_str("unknown"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}
