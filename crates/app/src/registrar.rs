//! Registry of the entities currently targeted by a loaded entry.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use controllable_domain::entity::EntityId;
use controllable_domain::id::ConfigEntryId;

/// Which entity each loaded entry targets.
///
/// Several entries may target the same entity; it stays registered until the
/// last of them is unregistered.
#[derive(Debug, Default)]
pub struct TargetRegistrar {
    targets: RwLock<HashMap<ConfigEntryId, EntityId>>,
}

impl TargetRegistrar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entity_id` as the target of `entry_id`, replacing any previous
    /// target of that entry. Returns the replaced target.
    pub fn register(&self, entry_id: ConfigEntryId, entity_id: EntityId) -> Option<EntityId> {
        let previous = self
            .targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry_id, entity_id.clone());
        tracing::debug!(%entry_id, target = %entity_id, "target registered");
        previous
    }

    pub fn unregister(&self, entry_id: ConfigEntryId) -> Option<EntityId> {
        let removed = self
            .targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&entry_id);
        if let Some(target) = &removed {
            tracing::debug!(%entry_id, %target, "target unregistered");
        }
        removed
    }

    #[must_use]
    pub fn is_target(&self, entity_id: &EntityId) -> bool {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|target| target == entity_id)
    }

    /// Distinct registered targets, sorted.
    #[must_use]
    pub fn targets(&self) -> BTreeSet<EntityId> {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
