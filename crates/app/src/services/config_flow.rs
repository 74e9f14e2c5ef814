//! Config flow — validates user input before an entry is created or edited.

use controllable_domain::config_entry::{ConfigEntry, Target};
use controllable_domain::entity::EntityId;
use controllable_domain::error::{ControllableError, ValidationError};
use controllable_domain::id::DeviceId;

use crate::ports::{DeviceRegistry, EntityRegistry, StateStore};
use crate::resolver::TargetResolver;

pub struct ConfigFlow<R, S> {
    registry: R,
    resolver: TargetResolver<R>,
    states: S,
}

impl<R, S> ConfigFlow<R, S>
where
    R: EntityRegistry + DeviceRegistry + Clone,
    S: StateStore,
{
    pub fn new(registry: R, states: S) -> Self {
        Self {
            resolver: TargetResolver::new(registry.clone()),
            registry,
            states,
        }
    }

    /// Check that `device_id` exists and exposes a switch, light or fan.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDevice`] otherwise, or a registry
    /// failure.
    #[tracing::instrument(skip(self))]
    pub async fn validate_device(&self, device_id: DeviceId) -> Result<(), ControllableError> {
        if self.registry.get_device(device_id).await?.is_none() {
            return Err(ValidationError::InvalidDevice(device_id).into());
        }
        if self.resolver.resolve_from_device(device_id).await.is_none() {
            return Err(ValidationError::InvalidDevice(device_id).into());
        }
        Ok(())
    }

    /// Check that `entity_id` has a state and belongs to a controllable
    /// domain.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTarget`] otherwise, or a state store
    /// failure.
    #[tracing::instrument(skip(self))]
    pub async fn validate_target(&self, entity_id: &EntityId) -> Result<(), ControllableError> {
        if !TargetResolver::<R>::resolve_from_entity(entity_id) {
            return Err(ValidationError::InvalidTarget(entity_id.clone()).into());
        }
        if self.states.current_state(entity_id).await?.is_none() {
            return Err(ValidationError::InvalidTarget(entity_id.clone()).into());
        }
        Ok(())
    }

    /// Build a new entry from user input.
    ///
    /// A device picked by the user is resolved to its first controllable
    /// entity here, so new entries are always in canonical shape.
    ///
    /// # Errors
    ///
    /// Returns [`ControllableError::Validation`] when the name is empty or
    /// the target does not pass validation.
    pub async fn create_entry(
        &self,
        name: impl Into<String>,
        target: Target,
    ) -> Result<ConfigEntry, ControllableError> {
        let name = name.into();
        ConfigEntry::new(name.clone(), target.clone()).validate()?;
        let entity_id = match target {
            Target::Entity(entity_id) => {
                self.validate_target(&entity_id).await?;
                entity_id
            }
            Target::Device(device_id) => {
                self.validate_device(device_id).await?;
                self.resolver
                    .resolve_from_device(device_id)
                    .await
                    .ok_or(ValidationError::InvalidDevice(device_id))?
            }
        };
        let entry = ConfigEntry::new(name, Target::Entity(entity_id));
        tracing::info!(entry_id = %entry.entry_id, title = %entry.title, "config entry created");
        Ok(entry)
    }

    /// Point an existing entry at a new target entity. The result is always
    /// in canonical shape.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTarget`] when the new target does
    /// not pass validation.
    pub async fn update_entry(
        &self,
        entry: ConfigEntry,
        target: EntityId,
    ) -> Result<ConfigEntry, ControllableError> {
        self.validate_target(&target).await?;
        let entry = entry.migrated(target);
        tracing::info!(entry_id = %entry.entry_id, "config entry updated");
        Ok(entry)
    }
}
