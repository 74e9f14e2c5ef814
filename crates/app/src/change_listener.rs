//! Change-detection listener.
//!
//! Watches raw `state_changed` events and republishes
//! `controllable_target_changed` for the entities some loaded entry targets.
//! Everything else is ignored.

use std::sync::Arc;

use controllable_domain::entity::EntityId;
use controllable_domain::event::{Event, EventKind};

use crate::event_bus::ListenerHandle;
use crate::ports::{EventPublisher, EventSubscriber};
use crate::registrar::TargetRegistrar;

pub struct TargetChangeListener<P> {
    registrar: Arc<TargetRegistrar>,
    publisher: P,
}

impl<P> TargetChangeListener<P>
where
    P: EventPublisher + Send + Sync,
{
    pub fn new(registrar: Arc<TargetRegistrar>, publisher: P) -> Self {
        Self {
            registrar,
            publisher,
        }
    }

    /// Republish `event` as a scoped notification when it is a state change
    /// of a registered target. Returns whether a notification went out.
    pub async fn handle_event(&self, event: &Event) -> bool {
        let EventKind::StateChanged { entity_id, .. } = &event.kind else {
            return false;
        };
        if !self.registrar.is_target(entity_id) {
            return false;
        }

        tracing::debug!(target_entity = %entity_id, "target state changed");
        self.notify(entity_id.clone()).await
    }

    /// Republish a change for every registered target. Used after the
    /// listener lagged and may have missed some state changes.
    pub async fn notify_all(&self) -> usize {
        let mut notified = 0;
        for target in self.registrar.targets() {
            if self.notify(target).await {
                notified += 1;
            }
        }
        tracing::debug!(notified, "republished every target after lag");
        notified
    }

    async fn notify(&self, entity_id: EntityId) -> bool {
        let event = Event::target_changed(entity_id.clone());
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(error = %err, target_entity = %entity_id, "target change lost");
            return false;
        }
        true
    }
}

impl<P> TargetChangeListener<P>
where
    P: EventPublisher + Send + Sync + 'static,
{
    /// Start listening on `bus`. Runs until the handle is dropped.
    pub fn spawn(self, bus: &impl EventSubscriber) -> ListenerHandle {
        let on_event = Arc::new(self);
        let on_lag = Arc::clone(&on_event);
        ListenerHandle::spawn_with_lag(
            "target_change_listener",
            bus.subscribe(),
            move |event| {
                let listener = Arc::clone(&on_event);
                async move {
                    listener.handle_event(&event).await;
                }
            },
            move || {
                let listener = Arc::clone(&on_lag);
                async move {
                    listener.notify_all().await;
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use controllable_domain::entity::EntityState;
    use controllable_domain::id::ConfigEntryId;

    use super::*;
    use crate::event_bus::InProcessEventBus;
    use crate::test_support::entity;

    type TestListener = TargetChangeListener<Arc<InProcessEventBus>>;

    fn registrar_for(targets: &[&str]) -> Arc<TargetRegistrar> {
        let registrar = Arc::new(TargetRegistrar::new());
        for raw in targets {
            registrar.register(ConfigEntryId::new(), entity(raw));
        }
        registrar
    }

    fn listener_for(targets: &[&str]) -> (Arc<InProcessEventBus>, TestListener) {
        let bus = Arc::new(InProcessEventBus::new(16));
        let listener = TargetChangeListener::new(registrar_for(targets), Arc::clone(&bus));
        (bus, listener)
    }

    #[tokio::test]
    async fn should_republish_state_change_of_registered_target() {
        let (bus, listener) = listener_for(&["light.a"]);
        let mut rx = bus.subscribe();

        let raw = Event::state_changed(
            entity("light.a"),
            Some(EntityState::Off),
            Some(EntityState::On),
        );
        assert!(listener.handle_event(&raw).await);

        let scoped = rx.recv().await.unwrap();
        assert_eq!(
            scoped.kind,
            EventKind::TargetChanged {
                entity_id: entity("light.a")
            }
        );
    }

    #[tokio::test]
    async fn should_ignore_state_change_of_unregistered_entity() {
        let (bus, listener) = listener_for(&["light.a"]);
        let mut rx = bus.subscribe();

        let raw = Event::state_changed(entity("light.b"), None, Some(EntityState::On));
        assert!(!listener.handle_event(&raw).await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_ignore_events_other_than_state_changes() {
        let (_bus, listener) = listener_for(&["light.a"]);
        let scoped = Event::target_changed(entity("light.a"));
        assert!(!listener.handle_event(&scoped).await);
    }

    #[tokio::test]
    async fn should_republish_from_spawned_listener() {
        let (bus, listener) = listener_for(&["fan.a"]);
        let mut rx = bus.subscribe();
        let _handle = listener.spawn(&bus);

        bus.publish(Event::state_changed(entity("fan.a"), None, Some(EntityState::Off)))
            .await
            .unwrap();

        let scoped = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let event = rx.recv().await.unwrap();
                if matches!(event.kind, EventKind::TargetChanged { .. }) {
                    break event;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(
            scoped.kind,
            EventKind::TargetChanged {
                entity_id: entity("fan.a")
            }
        );
    }

    #[tokio::test]
    async fn should_republish_every_target_when_lagging() {
        let raw_bus = Arc::new(InProcessEventBus::new(4));
        let scoped_bus = Arc::new(InProcessEventBus::new(16));
        let mut rx = scoped_bus.subscribe();
        let registrar = registrar_for(&["light.a", "fan.b"]);
        let listener = TargetChangeListener::new(registrar, Arc::clone(&scoped_bus));
        let _handle = listener.spawn(&raw_bus);

        raw_bus
            .publish(Event::state_changed(entity("light.a"), None, Some(EntityState::On)))
            .await
            .unwrap();
        for _ in 0..8 {
            raw_bus
                .publish(Event::state_changed(entity("light.noise"), None, None))
                .await
                .unwrap();
        }

        let mut republished = Vec::new();
        tokio::time::timeout(Duration::from_secs(1), async {
            while republished.len() < 2 {
                if let EventKind::TargetChanged { entity_id } = rx.recv().await.unwrap().kind {
                    republished.push(entity_id);
                }
            }
        })
        .await
        .unwrap();
        republished.sort();
        assert_eq!(republished, vec![entity("fan.b"), entity("light.a")]);
    }
}
