//! Hand-written host fakes shared by the unit tests of this crate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use controllable_domain::device::Device;
use controllable_domain::entity::{EntityId, EntityState, RegistryEntry};
use controllable_domain::error::{ControllableError, DispatchError};
use controllable_domain::id::DeviceId;
use controllable_domain::service::{Service, ServiceCall};

use crate::ports::{DeviceRegistry, EntityRegistry, ServiceDispatcher, StateStore};

pub fn entity(raw: &str) -> EntityId {
    EntityId::parse(raw).unwrap()
}

/// Registries, state store and dispatcher in one place.
///
/// By default a dispatched call is recorded but *not* applied, mimicking a
/// device that has not caught up yet.
#[derive(Default)]
pub struct FakeHost {
    devices: Mutex<Vec<Device>>,
    entries: Mutex<Vec<RegistryEntry>>,
    states: Mutex<HashMap<EntityId, EntityState>>,
    calls: Mutex<Vec<ServiceCall>>,
    apply_calls: Mutex<bool>,
    fail_with: Mutex<Option<String>>,
}

impl FakeHost {
    pub fn add_device(&self, device: Device) {
        self.devices.lock().unwrap().push(device);
    }

    pub fn add_entity(&self, raw: &str, device_id: Option<DeviceId>, state: Option<EntityState>) {
        let id = entity(raw);
        self.entries
            .lock()
            .unwrap()
            .push(RegistryEntry::new(id.clone(), device_id));
        if let Some(state) = state {
            self.states.lock().unwrap().insert(id, state);
        }
    }

    pub fn set_state(&self, raw: &str, state: EntityState) {
        self.states.lock().unwrap().insert(entity(raw), state);
    }

    pub fn apply_calls(&self, apply: bool) {
        *self.apply_calls.lock().unwrap() = apply;
    }

    pub fn fail_dispatch(&self, reason: &str) {
        *self.fail_with.lock().unwrap() = Some(reason.to_string());
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl EntityRegistry for FakeHost {
    fn entities_for_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<RegistryEntry>, ControllableError>> + Send {
        let r: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.device_id == Some(device_id))
            .cloned()
            .collect();
        async { Ok(r) }
    }

    fn device_of_entity(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<DeviceId>, ControllableError>> + Send {
        let r = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| &e.entity_id == entity_id)
            .and_then(|e| e.device_id);
        async move { Ok(r) }
    }
}

impl DeviceRegistry for FakeHost {
    fn get_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, ControllableError>> + Send {
        let r = self
            .devices
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == device_id)
            .cloned();
        async { Ok(r) }
    }
}

impl StateStore for FakeHost {
    fn current_state(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<EntityState>, ControllableError>> + Send {
        let r = self.states.lock().unwrap().get(entity_id).copied();
        async move { Ok(r) }
    }
}

impl ServiceDispatcher for FakeHost {
    fn call_service(
        &self,
        call: ServiceCall,
    ) -> impl Future<Output = Result<(), ControllableError>> + Send {
        self.calls.lock().unwrap().push(call.clone());
        let result = if let Some(reason) = self.fail_with.lock().unwrap().clone() {
            Err(DispatchError::Rejected {
                service: call.service,
                entity_id: call.entity_id,
                reason,
            }
            .into())
        } else {
            if *self.apply_calls.lock().unwrap() {
                let state = EntityState::from_on(call.service == Service::TurnOn);
                self.states.lock().unwrap().insert(call.entity_id, state);
            }
            Ok(())
        };
        async { result }
    }
}
