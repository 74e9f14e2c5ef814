//! # controllable-adapter-memory
//!
//! In-memory host: entity and device registries, a state store and a
//! service dispatcher backed by simulated entities. Every state change fires
//! a raw `state_changed` event on the configured publisher, the way a real
//! host would.
//!
//! Each simulated entity reacts to dispatched calls according to its
//! [`DispatchBehaviour`]: apply at once, defer until
//! [`InMemoryHost::apply_pending`], ignore, or fail.
//!
//! ## Dependency rule
//!
//! Depends on `controllable-app` (port traits) and `controllable-domain` only.

mod behaviour;
mod error;

pub use behaviour::DispatchBehaviour;
pub use error::MemoryHostError;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError, RwLock};

use controllable_app::ports::{
    DeviceRegistry, EntityRegistry, EventPublisher, ServiceDispatcher, StateStore,
};
use controllable_domain::device::Device;
use controllable_domain::entity::{EntityId, EntityState, RegistryEntry};
use controllable_domain::error::{ControllableError, DispatchError};
use controllable_domain::event::Event;
use controllable_domain::id::DeviceId;
use controllable_domain::service::{Service, ServiceCall};

/// Simulated host platform.
pub struct InMemoryHost<P> {
    publisher: P,
    devices: RwLock<Vec<Device>>,
    // registry order is insertion order
    entities: RwLock<Vec<RegistryEntry>>,
    states: RwLock<HashMap<EntityId, EntityState>>,
    behaviours: RwLock<HashMap<EntityId, DispatchBehaviour>>,
    pending: Mutex<Vec<ServiceCall>>,
    calls: Mutex<Vec<ServiceCall>>,
}

impl<P: EventPublisher + Send + Sync> InMemoryHost<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            devices: RwLock::default(),
            entities: RwLock::default(),
            states: RwLock::default(),
            behaviours: RwLock::default(),
            pending: Mutex::default(),
            calls: Mutex::default(),
        }
    }

    /// Add a device to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryHostError::Domain`] when the device is invalid.
    pub fn add_device(&self, device: Device) -> Result<(), MemoryHostError> {
        device.validate()?;
        tracing::debug!(device_id = %device.id, name = %device.name, "device added");
        self.devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(device);
        Ok(())
    }

    /// Register an entity, optionally attached to a known device, with an
    /// initial state. No event is fired.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryHostError::DuplicateEntity`] or
    /// [`MemoryHostError::UnknownDevice`].
    pub fn add_entity(
        &self,
        entity_id: EntityId,
        device_id: Option<DeviceId>,
        state: Option<EntityState>,
        behaviour: DispatchBehaviour,
    ) -> Result<(), MemoryHostError> {
        if let Some(device_id) = device_id {
            let known = self
                .devices
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|device| device.id == device_id);
            if !known {
                return Err(MemoryHostError::UnknownDevice(device_id));
            }
        }

        let mut entities = self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entities.iter().any(|entry| entry.entity_id == entity_id) {
            return Err(MemoryHostError::DuplicateEntity(entity_id));
        }
        entities.push(RegistryEntry::new(entity_id.clone(), device_id));
        drop(entities);

        if let Some(state) = state {
            self.states
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(entity_id.clone(), state);
        }
        tracing::debug!(%entity_id, ?behaviour, "entity added");
        self.behaviours
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity_id, behaviour);
        Ok(())
    }

    /// Change an entity's state as if the device reported it, and fire
    /// `state_changed`. Setting the current state again fires nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryHostError::UnknownEntity`] when the entity is not
    /// registered, or the publisher's failure.
    pub async fn set_state(
        &self,
        entity_id: &EntityId,
        new_state: EntityState,
    ) -> Result<(), MemoryHostError> {
        if !self.is_registered(entity_id) {
            return Err(MemoryHostError::UnknownEntity(entity_id.clone()));
        }
        let old_state = self
            .states
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity_id.clone(), new_state);
        if old_state == Some(new_state) {
            return Ok(());
        }

        tracing::debug!(%entity_id, ?old_state, %new_state, "state changed");
        self.publisher
            .publish(Event::state_changed(
                entity_id.clone(),
                old_state,
                Some(new_state),
            ))
            .await?;
        Ok(())
    }

    /// Apply every deferred call, oldest first. Returns how many were applied.
    ///
    /// # Errors
    ///
    /// Returns the first failure; later calls stay pending.
    pub async fn apply_pending(&self) -> Result<usize, MemoryHostError> {
        let mut pending: Vec<_> = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut applied = 0;
        while !pending.is_empty() {
            let call = pending.remove(0);
            if let Err(err) = self.apply(&call).await {
                pending.insert(0, call);
                let mut queue = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                pending.append(&mut *queue);
                *queue = pending;
                return Err(err);
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Every call dispatched so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn state_of(&self, entity_id: &EntityId) -> Option<EntityState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity_id)
            .copied()
    }

    fn is_registered(&self, entity_id: &EntityId) -> bool {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| &entry.entity_id == entity_id)
    }

    async fn apply(&self, call: &ServiceCall) -> Result<(), MemoryHostError> {
        let state = EntityState::from_on(call.service == Service::TurnOn);
        self.set_state(&call.entity_id, state).await
    }

    #[tracing::instrument(skip(self), fields(service = %call.service, entity_id = %call.entity_id))]
    async fn dispatch(&self, call: ServiceCall) -> Result<(), ControllableError> {
        if !self.is_registered(&call.entity_id) {
            return Err(MemoryHostError::UnknownEntity(call.entity_id).into());
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.clone());

        let behaviour = self
            .behaviours
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&call.entity_id)
            .cloned()
            .unwrap_or_default();
        match behaviour {
            DispatchBehaviour::Apply => self.apply(&call).await?,
            DispatchBehaviour::Defer => {
                tracing::debug!("call deferred");
                self.pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(call);
            }
            DispatchBehaviour::Ignore => tracing::debug!("call ignored"),
            DispatchBehaviour::Fail(reason) => {
                return Err(DispatchError::Rejected {
                    service: call.service,
                    entity_id: call.entity_id,
                    reason,
                }
                .into());
            }
        }
        Ok(())
    }
}

impl<P: EventPublisher + Send + Sync> EntityRegistry for InMemoryHost<P> {
    fn entities_for_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<RegistryEntry>, ControllableError>> + Send {
        let result: Vec<_> = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.device_id == Some(device_id))
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn device_of_entity(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<DeviceId>, ControllableError>> + Send {
        let result = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|entry| &entry.entity_id == entity_id)
            .and_then(|entry| entry.device_id);
        async move { Ok(result) }
    }
}

impl<P: EventPublisher + Send + Sync> DeviceRegistry for InMemoryHost<P> {
    fn get_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, ControllableError>> + Send {
        let result = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|device| device.id == device_id)
            .cloned();
        async { Ok(result) }
    }
}

impl<P: EventPublisher + Send + Sync> StateStore for InMemoryHost<P> {
    fn current_state(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<EntityState>, ControllableError>> + Send {
        let result = self.state_of(entity_id);
        async move { Ok(result) }
    }
}

impl<P: EventPublisher + Send + Sync> ServiceDispatcher for InMemoryHost<P> {
    fn call_service(
        &self,
        call: ServiceCall,
    ) -> impl Future<Output = Result<(), ControllableError>> + Send {
        self.dispatch(call)
    }
}
