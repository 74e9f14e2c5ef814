//! Registry ports — query-only access to the host entity and device registries.

use std::future::Future;
use std::sync::Arc;

use controllable_domain::device::Device;
use controllable_domain::entity::{EntityId, RegistryEntry};
use controllable_domain::error::ControllableError;
use controllable_domain::id::DeviceId;

/// Read access to the host entity registry.
pub trait EntityRegistry {
    /// All entities registered under `device_id`, in registry order.
    ///
    /// An unknown device yields an empty list.
    fn entities_for_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<RegistryEntry>, ControllableError>> + Send;

    /// The device an entity belongs to, if any.
    fn device_of_entity(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<DeviceId>, ControllableError>> + Send;
}

/// Read access to the host device registry.
pub trait DeviceRegistry {
    /// Look up a device by id.
    fn get_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, ControllableError>> + Send;
}

impl<T: EntityRegistry + Send + Sync> EntityRegistry for Arc<T> {
    fn entities_for_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<RegistryEntry>, ControllableError>> + Send {
        (**self).entities_for_device(device_id)
    }

    fn device_of_entity(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<DeviceId>, ControllableError>> + Send {
        (**self).device_of_entity(entity_id)
    }
}

impl<T: DeviceRegistry + Send + Sync> DeviceRegistry for Arc<T> {
    fn get_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, ControllableError>> + Send {
        (**self).get_device(device_id)
    }
}
