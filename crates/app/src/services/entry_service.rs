//! Entry service — loads configuration entries into live switches.
//!
//! Setting up an entry migrates it to the canonical shape when needed,
//! registers its target, builds the switch and subscribes it to scoped target
//! changes. The change-detection listener is shared by every loaded entry: it
//! starts with the first one and stops when the last one is unloaded.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use controllable_domain::config_entry::{ConfigEntry, Target};
use controllable_domain::device::DeviceLink;
use controllable_domain::diagnostics::EntryDiagnostics;
use controllable_domain::entity::EntityId;
use controllable_domain::error::{ControllableError, NotFoundError, ResolutionError};
use controllable_domain::id::ConfigEntryId;

use crate::change_listener::TargetChangeListener;
use crate::event_bus::ListenerHandle;
use crate::ports::{
    DeviceRegistry, EntityRegistry, EventPublisher, EventSubscriber, ServiceDispatcher, StateStore,
};
use crate::registrar::TargetRegistrar;
use crate::resolver::TargetResolver;
use crate::switch::{ControllableSwitch, SwitchIdentity, SwitchOptions, SwitchPorts};

/// Result of loading one entry.
pub struct SetupOutcome<S, D, B> {
    /// The entry as loaded. Differs from the input when it was migrated.
    pub entry: ConfigEntry,
    pub migrated: bool,
    pub switch: Arc<ControllableSwitch<S, D, B>>,
}

struct LoadedEntry<S, D, B> {
    entry: ConfigEntry,
    switch: Arc<ControllableSwitch<S, D, B>>,
    _listener: Option<ListenerHandle>,
}

struct Loaded<S, D, B> {
    entries: HashMap<ConfigEntryId, LoadedEntry<S, D, B>>,
    change_listener: Option<ListenerHandle>,
}

/// Application service owning every loaded entry.
pub struct EntryService<R, S, D, B> {
    registry: R,
    resolver: TargetResolver<R>,
    ports: SwitchPorts<S, D, B>,
    options: SwitchOptions,
    registrar: Arc<TargetRegistrar>,
    loaded: Mutex<Loaded<S, D, B>>,
}

impl<R, S, D, B> EntryService<R, S, D, B>
where
    R: EntityRegistry + DeviceRegistry + Clone + Send + Sync,
    S: StateStore + Clone + Send + Sync + 'static,
    D: ServiceDispatcher + Clone + Send + Sync + 'static,
    B: EventPublisher + EventSubscriber + Clone + Send + Sync + 'static,
{
    /// `bus` carries raw state changes in and scoped notifications and
    /// switch updates out.
    pub fn new(registry: R, states: S, dispatcher: D, bus: B, options: SwitchOptions) -> Self {
        Self {
            resolver: TargetResolver::new(registry.clone()),
            registry,
            ports: SwitchPorts {
                states,
                dispatcher,
                publisher: bus,
            },
            options,
            registrar: Arc::new(TargetRegistrar::new()),
            loaded: Mutex::new(Loaded {
                entries: HashMap::new(),
                change_listener: None,
            }),
        }
    }

    #[must_use]
    pub fn registrar(&self) -> &Arc<TargetRegistrar> {
        &self.registrar
    }

    /// Load `entry` and start its switch. An entry that is already loaded is
    /// reloaded.
    ///
    /// An entry whose target cannot be resolved still loads, as a degraded
    /// switch; the failure is logged.
    ///
    /// # Errors
    ///
    /// Returns [`ControllableError::Validation`] when the entry is malformed.
    #[tracing::instrument(skip_all, fields(entry_id = %entry.entry_id, name = %entry.data.name))]
    pub async fn setup_entry(
        &self,
        entry: ConfigEntry,
    ) -> Result<SetupOutcome<S, D, B>, ControllableError> {
        entry.validate()?;

        let mut loaded = self.loaded.lock().await;
        if loaded.entries.contains_key(&entry.entry_id) {
            tracing::info!("entry already loaded, reloading");
            self.release(&mut loaded, entry.entry_id);
        }

        let (entry, migrated) = self.migrate(entry).await;
        let target = entry.target_entity().cloned().filter(|target| {
            if TargetResolver::<R>::resolve_from_entity(target) {
                return true;
            }
            let err = ResolutionError::UnsupportedDomain(target.clone());
            tracing::error!(error = %err, "target rejected, switch is degraded");
            false
        });

        let device = match &target {
            Some(target) => self.device_link(target).await,
            None => None,
        };
        if let Some(target) = &target {
            self.registrar.register(entry.entry_id, target.clone());
        }

        // Both subscriptions exist before the seed read, so a target change
        // racing with it is still seen.
        if loaded.change_listener.is_none() {
            let change_listener = TargetChangeListener::new(
                Arc::clone(&self.registrar),
                self.ports.publisher.clone(),
            );
            loaded.change_listener = Some(change_listener.spawn(&self.ports.publisher));
            tracing::debug!("change-detection listener started");
        }
        let events = target.as_ref().map(|_| self.ports.publisher.subscribe());

        let switch = Arc::new(
            ControllableSwitch::initialize(
                SwitchIdentity {
                    entry_id: entry.entry_id,
                    name: entry.data.name.clone(),
                    target: target.clone(),
                    device,
                },
                self.ports.clone(),
                self.options,
            )
            .await,
        );
        let listener = events.map(|events| switch.listen(events));

        switch.announce().await;
        tracing::info!(unique_id = switch.unique_id(), migrated, "entry loaded");

        loaded.entries.insert(
            entry.entry_id,
            LoadedEntry {
                entry: entry.clone(),
                switch: Arc::clone(&switch),
                _listener: listener,
            },
        );

        Ok(SetupOutcome {
            entry,
            migrated,
            switch,
        })
    }

    /// Stop the switch of `entry_id` and forget its target. Returns `false`
    /// when the entry was not loaded.
    #[tracing::instrument(skip(self))]
    pub async fn unload_entry(&self, entry_id: ConfigEntryId) -> bool {
        let mut loaded = self.loaded.lock().await;
        let unloaded = self.release(&mut loaded, entry_id);
        if unloaded {
            tracing::info!("entry unloaded");
        }
        unloaded
    }

    /// Unload every entry.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        let mut loaded = self.loaded.lock().await;
        let entry_ids: Vec<_> = loaded.entries.keys().copied().collect();
        for entry_id in entry_ids {
            self.release(&mut loaded, entry_id);
        }
        tracing::info!("all entries unloaded");
    }

    /// The live switch of a loaded entry.
    pub async fn switch(
        &self,
        entry_id: ConfigEntryId,
    ) -> Option<Arc<ControllableSwitch<S, D, B>>> {
        self.loaded
            .lock()
            .await
            .entries
            .get(&entry_id)
            .map(|loaded| Arc::clone(&loaded.switch))
    }

    /// Ids of all loaded entries, sorted.
    pub async fn loaded_entries(&self) -> Vec<ConfigEntryId> {
        let mut ids: Vec<_> = self.loaded.lock().await.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Entry data and the state of every live controllable switch.
    ///
    /// # Errors
    ///
    /// Returns [`ControllableError::NotFound`] when the entry is not loaded.
    pub async fn diagnostics(
        &self,
        entry_id: ConfigEntryId,
    ) -> Result<EntryDiagnostics, ControllableError> {
        let (entry, switches) = {
            let loaded = self.loaded.lock().await;
            let entry = loaded
                .entries
                .get(&entry_id)
                .map(|loaded| loaded.entry.clone())
                .ok_or_else(|| NotFoundError::config_entry(entry_id))?;
            let switches: Vec<_> = loaded
                .entries
                .values()
                .map(|loaded| Arc::clone(&loaded.switch))
                .collect();
            (entry, switches)
        };

        let mut snapshots = Vec::with_capacity(switches.len());
        for switch in switches {
            snapshots.push(switch.snapshot().await);
        }
        snapshots.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        Ok(EntryDiagnostics::new(&entry, &snapshots))
    }

    /// Rewrite a device-based entry to target the device's first controllable
    /// entity. An entry that cannot be migrated is returned untouched.
    async fn migrate(&self, entry: ConfigEntry) -> (ConfigEntry, bool) {
        let &Target::Device(device_id) = &entry.data.target else {
            return (entry, false);
        };
        match self.resolver.resolve_from_device(device_id).await {
            Some(entity_id) => {
                tracing::info!(%device_id, target = %entity_id, "device entry migrated");
                (entry.migrated(entity_id), true)
            }
            None => {
                let err = ResolutionError::NoControllableEntity(device_id);
                tracing::error!(error = %err, "entry migration failed, switch is degraded");
                (entry, false)
            }
        }
    }

    /// Identity of the target's device, when the registry knows it.
    async fn device_link(&self, target: &EntityId) -> Option<DeviceLink> {
        let device_id = match self.registry.device_of_entity(target).await {
            Ok(Some(device_id)) => device_id,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, %target, "entity registry lookup failed");
                return None;
            }
        };
        match self.registry.get_device(device_id).await {
            Ok(Some(device)) => Some(device.link()),
            Ok(None) => {
                tracing::error!(%device_id, %target, "target device not found in registry");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, %device_id, "device registry lookup failed");
                None
            }
        }
    }

    fn release(&self, loaded: &mut Loaded<S, D, B>, entry_id: ConfigEntryId) -> bool {
        let Some(entry) = loaded.entries.remove(&entry_id) else {
            return false;
        };
        drop(entry);
        self.registrar.unregister(entry_id);
        if loaded.entries.is_empty() && loaded.change_listener.take().is_some() {
            tracing::debug!("change-detection listener stopped");
        }
        true
    }
}
