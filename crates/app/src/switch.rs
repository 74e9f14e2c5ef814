//! Controllable switch — the sync reconciler.
//!
//! A switch keeps its own believed on/off state, forwards `turn_on` /
//! `turn_off` to its target entity and recomputes whether the target still
//! agrees. The `(believed_on, synced)` pair sits behind one async mutex that
//! is held for a whole command (set, dispatch, read, recompute) and for every
//! recompute, so the two never interleave.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast};

use controllable_domain::device::DeviceLink;
use controllable_domain::entity::EntityId;
use controllable_domain::error::{ControllableError, DispatchError, ResolutionError};
use controllable_domain::event::{Event, EventKind};
use controllable_domain::id::ConfigEntryId;
use controllable_domain::service::{Service, ServiceCall};
use controllable_domain::switch::{SwitchSnapshot, SyncState, unique_id};

use crate::event_bus::ListenerHandle;
use crate::ports::{EventPublisher, ServiceDispatcher, StateStore};

/// Behaviour knobs shared by every switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchOptions {
    /// Seed a switch as synced even when its target has no reading yet.
    pub assume_synced_when_unavailable: bool,
    /// Give up on a dispatch after this long. `None` waits forever.
    pub command_timeout: Option<Duration>,
}

/// Host ports a switch talks to.
#[derive(Debug, Clone)]
pub struct SwitchPorts<S, D, P> {
    pub states: S,
    pub dispatcher: D,
    pub publisher: P,
}

/// Identity of a switch, fixed at construction.
#[derive(Debug, Clone)]
pub struct SwitchIdentity {
    pub entry_id: ConfigEntryId,
    pub name: String,
    pub target: Option<EntityId>,
    pub device: Option<DeviceLink>,
}

/// A virtual on/off switch bound to one target entity.
pub struct ControllableSwitch<S, D, P> {
    entry_id: ConfigEntryId,
    unique_id: String,
    name: String,
    target: Option<EntityId>,
    device: Option<DeviceLink>,
    state: Mutex<SyncState>,
    ports: SwitchPorts<S, D, P>,
    options: SwitchOptions,
}

impl<S, D, P> ControllableSwitch<S, D, P>
where
    S: StateStore + Send + Sync,
    D: ServiceDispatcher + Send + Sync,
    P: EventPublisher + Send + Sync,
{
    /// Build a switch and seed its believed state from the target's current
    /// reading.
    ///
    /// A switch without a target starts degraded: off, unsynced, and it
    /// stays unsynced for its whole life.
    #[tracing::instrument(skip_all, fields(name = %identity.name, target = ?identity.target))]
    pub async fn initialize(
        identity: SwitchIdentity,
        ports: SwitchPorts<S, D, P>,
        options: SwitchOptions,
    ) -> Self {
        let state = match &identity.target {
            Some(target) => {
                let reading = read_target(&ports.states, target).await;
                SyncState::seed(reading, options.assume_synced_when_unavailable)
            }
            None => SyncState::degraded(),
        };
        tracing::debug!(
            believed_on = state.believed_on(),
            synced = state.synced(),
            "switch initialized"
        );
        Self {
            unique_id: unique_id(identity.entry_id, &identity.name),
            entry_id: identity.entry_id,
            name: identity.name,
            target: identity.target,
            device: identity.device,
            state: Mutex::new(state),
            ports,
            options,
        }
    }

    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn target_entity(&self) -> Option<&EntityId> {
        self.target.as_ref()
    }

    pub async fn is_on(&self) -> bool {
        self.state.lock().await.believed_on()
    }

    pub async fn is_synced(&self) -> bool {
        self.state.lock().await.synced()
    }

    pub async fn snapshot(&self) -> SwitchSnapshot {
        let state = *self.state.lock().await;
        self.snapshot_of(state)
    }

    /// Turn the switch on and forward `turn_on` to the target.
    ///
    /// # Errors
    ///
    /// Returns [`ControllableError::Resolution`] when the switch has no
    /// target (nothing is dispatched), or the dispatch error reported by the
    /// host. The believed state is set either way.
    pub async fn turn_on(&self) -> Result<(), ControllableError> {
        self.command(true).await
    }

    /// Turn the switch off and forward `turn_off` to the target.
    ///
    /// # Errors
    ///
    /// See [`turn_on`](Self::turn_on).
    pub async fn turn_off(&self) -> Result<(), ControllableError> {
        self.command(false).await
    }

    #[tracing::instrument(skip(self), fields(switch = %self.unique_id))]
    async fn command(&self, on: bool) -> Result<(), ControllableError> {
        let Some(target) = &self.target else {
            tracing::error!("command rejected, switch has no target entity");
            return Err(ResolutionError::Unresolved(self.unique_id.clone()).into());
        };

        let mut state = self.state.lock().await;
        state.command(on);

        let service = Service::for_state(on);
        let dispatched = self.dispatch(ServiceCall::new(service, target.clone())).await;
        if let Err(err) = &dispatched {
            tracing::warn!(error = %err, %service, %target, "dispatch failed");
        }

        // The target may not have applied the call yet; a later
        // controllable_target_changed event settles it.
        let reading = read_target(&self.ports.states, target).await;
        state.reconcile(reading);
        let snapshot = self.snapshot_of(*state);
        drop(state);

        self.write_state(snapshot).await;
        dispatched
    }

    /// Recompute the sync flag against the target's current reading.
    ///
    /// Never changes the believed state. Returns the resulting flag, which is
    /// always `false` for a switch without target.
    #[tracing::instrument(skip(self), fields(switch = %self.unique_id))]
    pub async fn recompute_sync(&self) -> bool {
        let Some(target) = &self.target else {
            return false;
        };

        let mut state = self.state.lock().await;
        let reading = read_target(&self.ports.states, target).await;
        if state.reconcile(reading) {
            tracing::info!(synced = state.synced(), ?reading, "sync status changed");
        }
        let synced = state.synced();
        let snapshot = self.snapshot_of(*state);
        drop(state);

        self.write_state(snapshot).await;
        synced
    }

    /// React to a bus event. Only `controllable_target_changed` for this
    /// switch's own target triggers a recompute.
    ///
    /// Returns whether the event was for this switch.
    pub async fn handle_event(&self, event: &Event) -> bool {
        match (&event.kind, &self.target) {
            (EventKind::TargetChanged { entity_id }, Some(target)) if entity_id == target => {
                self.recompute_sync().await;
                true
            }
            _ => false,
        }
    }

    /// Publish the current state on the bus.
    pub async fn announce(&self) {
        let snapshot = self.snapshot().await;
        self.write_state(snapshot).await;
    }

    async fn dispatch(&self, call: ServiceCall) -> Result<(), ControllableError> {
        let Some(after) = self.options.command_timeout else {
            return self.ports.dispatcher.call_service(call).await;
        };
        let service = call.service;
        let entity_id = call.entity_id.clone();
        match tokio::time::timeout(after, self.ports.dispatcher.call_service(call)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(DispatchError::TimedOut {
                service,
                entity_id,
                after,
            }
            .into()),
        }
    }

    async fn write_state(&self, snapshot: SwitchSnapshot) {
        if let Err(err) = self
            .ports
            .publisher
            .publish(Event::switch_updated(snapshot))
            .await
        {
            tracing::warn!(error = %err, switch = %self.unique_id, "switch state not published");
        }
    }

    fn snapshot_of(&self, state: SyncState) -> SwitchSnapshot {
        SwitchSnapshot {
            unique_id: self.unique_id.clone(),
            entry_id: self.entry_id,
            name: self.name.clone(),
            is_on: state.believed_on(),
            is_synced: state.synced(),
            target_entity: self.target.clone(),
            device: self.device.clone(),
        }
    }
}

impl<S, D, P> ControllableSwitch<S, D, P>
where
    S: StateStore + Send + Sync + 'static,
    D: ServiceDispatcher + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
{
    /// Listen for scoped target changes on `events` and recompute on each
    /// match, and after any lag on the receiver.
    ///
    /// Take the receiver before [`initialize`](Self::initialize) so no change
    /// slips in between the seed read and the subscription. The subscription
    /// lives as long as the returned handle.
    pub fn listen(self: &Arc<Self>, events: broadcast::Receiver<Event>) -> ListenerHandle {
        let on_event = Arc::clone(self);
        let on_lag = Arc::clone(self);
        ListenerHandle::spawn_with_lag(
            "controllable_switch",
            events,
            move |event| {
                let switch = Arc::clone(&on_event);
                async move {
                    switch.handle_event(&event).await;
                }
            },
            move || {
                let switch = Arc::clone(&on_lag);
                async move {
                    switch.recompute_sync().await;
                }
            },
        )
    }
}

/// Target reading; store failures count as "no reading".
async fn read_target<S: StateStore>(states: &S, target: &EntityId) -> Option<bool> {
    match states.current_reading(target).await {
        Ok(reading) => reading,
        Err(err) => {
            tracing::warn!(error = %err, %target, "failed to read target state");
            None
        }
    }
}
