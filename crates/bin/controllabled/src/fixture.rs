//! Populates the in-memory host from the configuration file.

use std::collections::HashMap;

use controllable_adapter_memory::{InMemoryHost, MemoryHostError};
use controllable_app::ports::EventPublisher;
use controllable_domain::device::Device;
use controllable_domain::id::DeviceId;

use crate::config::Config;

/// Add every configured device and entity to `host`.
///
/// # Errors
///
/// Returns the first device or entity the host refuses.
pub fn populate<P>(host: &InMemoryHost<P>, config: &Config) -> Result<(), MemoryHostError>
where
    P: EventPublisher + Send + Sync,
{
    let mut device_ids: HashMap<&str, DeviceId> = HashMap::with_capacity(config.devices.len());
    for entry in &config.devices {
        let mut builder = Device::builder().name(entry.name.clone());
        if let Some(id) = entry.id {
            builder = builder.id(id);
        }
        for (namespace, value) in &entry.identifiers {
            builder = builder.identifier(namespace.clone(), value.clone());
        }
        for (kind, value) in &entry.connections {
            builder = builder.connection(kind.clone(), value.clone());
        }
        let device = builder.build()?;
        device_ids.insert(entry.name.as_str(), device.id);
        host.add_device(device)?;
    }

    for entry in &config.entities {
        let device_id = entry
            .device
            .as_deref()
            .and_then(|name| device_ids.get(name).copied());
        host.add_entity(
            entry.entity_id.clone(),
            device_id,
            entry.state,
            entry.behaviour.clone(),
        )?;
    }

    tracing::info!(
        devices = config.devices.len(),
        entities = config.entities.len(),
        "simulated host populated"
    );
    Ok(())
}
