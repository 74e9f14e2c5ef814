//! State store port — current reported state of host entities.

use std::future::Future;
use std::sync::Arc;

use controllable_domain::entity::{EntityId, EntityState};
use controllable_domain::error::ControllableError;

/// Read access to the host state store.
pub trait StateStore {
    /// Current state of an entity, or `None` when the store has no state for it.
    fn current_state(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<EntityState>, ControllableError>> + Send;

    /// Current on/off reading of an entity.
    ///
    /// `None` when the entity is unknown to the store or reports neither
    /// `on` nor `off`.
    fn current_reading(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<bool>, ControllableError>> + Send {
        let state = self.current_state(entity_id);
        async move { Ok(state.await?.and_then(EntityState::reading)) }
    }
}

impl<T: StateStore + Send + Sync> StateStore for Arc<T> {
    fn current_state(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<EntityState>, ControllableError>> + Send {
        (**self).current_state(entity_id)
    }
}
