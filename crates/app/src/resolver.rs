//! Target resolver — finds the entity a controllable switch drives.

use controllable_domain::entity::{EntityId, RegistryEntry};
use controllable_domain::id::DeviceId;

use crate::ports::EntityRegistry;

/// Resolves configured devices and entities into a target entity id.
///
/// Resolution never fails loudly: anything that cannot be resolved is
/// `None` / `false` and the caller decides how to surface it.
pub struct TargetResolver<R> {
    registry: R,
}

impl<R: EntityRegistry> TargetResolver<R> {
    pub fn new(registry: R) -> Self {
        Self { registry }
    }

    /// First entity of `device_id` whose domain is `switch`, `light` or `fan`.
    ///
    /// Entities are scanned in the order the registry yields them. When a
    /// device has several qualifying entities, which one wins depends only on
    /// that order; callers must not rely on any particular tie-break.
    /// Unknown devices, devices without a qualifying entity and registry
    /// failures all yield `None`.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_from_device(&self, device_id: DeviceId) -> Option<EntityId> {
        let entries = match self.registry.entities_for_device(device_id).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(error = %err, "entity registry lookup failed");
                return None;
            }
        };
        entries
            .into_iter()
            .find(RegistryEntry::is_controllable)
            .map(|entry| entry.entity_id)
    }

    /// Whether `entity_id` belongs to a controllable domain.
    ///
    /// Only the identifier prefix is inspected; availability is not checked.
    #[must_use]
    pub fn resolve_from_entity(entity_id: &EntityId) -> bool {
        entity_id.controllable_domain().is_some()
    }
}
