//! End-to-end tests for the full controllabled stack.
//!
//! Each test wires the real in-memory host, the real event bus and the real
//! entry service, then drives the switches the way the daemon does. Raw
//! `state_changed` events come from the host itself.

use std::sync::Arc;
use std::time::Duration;

use controllable_adapter_memory::{DispatchBehaviour, InMemoryHost};
use controllable_app::event_bus::InProcessEventBus;
use controllable_app::ports::EventSubscriber;
use controllable_app::services::{EntryService, SetupOutcome};
use controllable_app::switch::{ControllableSwitch, SwitchOptions};
use controllable_domain::config_entry::{ConfigEntry, Target};
use controllable_domain::device::Device;
use controllable_domain::entity::{EntityId, EntityState};
use controllable_domain::error::{ControllableError, DispatchError, ResolutionError};
use controllable_domain::event::EventKind;
use controllable_domain::service::{Service, ServiceCall};

type Bus = Arc<InProcessEventBus>;
type Host = Arc<InMemoryHost<Bus>>;
type Entries = EntryService<Host, Host, Host, Bus>;
type Switch = Arc<ControllableSwitch<Host, Host, Bus>>;

struct Stack {
    bus: Bus,
    host: Host,
    service: Entries,
}

fn stack() -> Stack {
    let bus = Arc::new(InProcessEventBus::new(256));
    let host = Arc::new(InMemoryHost::new(Arc::clone(&bus)));
    let service = EntryService::new(
        Arc::clone(&host),
        Arc::clone(&host),
        Arc::clone(&host),
        Arc::clone(&bus),
        SwitchOptions::default(),
    );
    Stack { bus, host, service }
}

fn entity(raw: &str) -> EntityId {
    EntityId::parse(raw).unwrap()
}

impl Stack {
    fn add(&self, raw: &str, state: EntityState, behaviour: DispatchBehaviour) {
        self.host
            .add_entity(entity(raw), None, Some(state), behaviour)
            .unwrap();
    }

    async fn load(&self, name: &str, raw: &str) -> SetupOutcome<Host, Host, Bus> {
        self.service
            .setup_entry(ConfigEntry::new(name, Target::Entity(entity(raw))))
            .await
            .unwrap()
    }
}

async fn wait_until_synced(switch: &Switch) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !switch.is_synced().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("switch should become synced");
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_resync_after_target_applies_deferred_command() {
    let stack = stack();
    stack.add("light.kitchen", EntityState::On, DispatchBehaviour::Defer);
    let switch = stack.load("Kitchen", "light.kitchen").await.switch;
    assert!(switch.is_on().await);
    assert!(switch.is_synced().await);

    switch.turn_off().await.unwrap();
    assert!(!switch.is_on().await);
    assert!(!switch.is_synced().await);

    assert_eq!(stack.host.apply_pending().await.unwrap(), 1);
    wait_until_synced(&switch).await;
    assert!(!switch.is_on().await);
}

#[tokio::test]
async fn should_be_synced_right_after_command_when_target_applies_immediately() {
    let stack = stack();
    stack.add("switch.pump", EntityState::Off, DispatchBehaviour::Apply);
    let switch = stack.load("Pump", "switch.pump").await.switch;

    switch.turn_on().await.unwrap();

    assert!(switch.is_synced().await);
    assert_eq!(
        stack.host.calls(),
        vec![ServiceCall::new(Service::TurnOn, entity("switch.pump"))]
    );
}

#[tokio::test]
async fn should_lose_sync_when_target_changes_externally() {
    let stack = stack();
    stack.add("fan.attic", EntityState::On, DispatchBehaviour::Apply);
    let switch = stack.load("Attic", "fan.attic").await.switch;
    let mut updates = stack.bus.subscribe();

    stack
        .host
        .set_state(&entity("fan.attic"), EntityState::Off)
        .await
        .unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let EventKind::SwitchUpdated { snapshot } = updates.recv().await.unwrap().kind {
                break snapshot;
            }
        }
    })
    .await
    .unwrap();
    assert!(snapshot.is_on);
    assert!(!snapshot.is_synced);
    assert!(switch.is_on().await);
}

#[tokio::test]
async fn should_recompute_only_switch_targeting_changed_entity() {
    let stack = stack();
    stack.add("switch.a", EntityState::Off, DispatchBehaviour::Defer);
    stack.add("switch.b", EntityState::Off, DispatchBehaviour::Defer);
    let a = stack.load("A", "switch.a").await.switch;
    let b = stack.load("B", "switch.b").await.switch;
    a.turn_on().await.unwrap();
    b.turn_on().await.unwrap();
    let mut updates = stack.bus.subscribe();

    stack
        .host
        .set_state(&entity("switch.a"), EntityState::On)
        .await
        .unwrap();
    wait_until_synced(&a).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut updated = Vec::new();
    while let Ok(event) = updates.try_recv() {
        if let EventKind::SwitchUpdated { snapshot } = event.kind {
            updated.push(snapshot.unique_id);
        }
    }
    assert!(updated.iter().any(|id| id == a.unique_id()));
    assert!(updated.iter().all(|id| id != b.unique_id()));
    assert!(!b.is_synced().await);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_keep_believed_state_when_dispatch_fails() {
    let stack = stack();
    stack.add(
        "switch.heater",
        EntityState::Off,
        DispatchBehaviour::Fail("device offline".to_string()),
    );
    let switch = stack.load("Heater", "switch.heater").await.switch;

    let result = switch.turn_on().await;

    assert!(matches!(
        result,
        Err(ControllableError::Dispatch(DispatchError::Rejected { .. }))
    ));
    assert!(switch.is_on().await);
    assert!(!switch.is_synced().await);
}

#[tokio::test]
async fn should_never_dispatch_for_unresolved_device_target() {
    let stack = stack();
    let device = Device::builder().name("Thermometer").build().unwrap();
    let device_id = device.id;
    stack.host.add_device(device).unwrap();
    stack
        .host
        .add_entity(
            entity("sensor.temperature"),
            Some(device_id),
            Some(EntityState::On),
            DispatchBehaviour::Apply,
        )
        .unwrap();

    let outcome = stack
        .service
        .setup_entry(ConfigEntry::new("Thermo", Target::Device(device_id)))
        .await
        .unwrap();
    let switch = outcome.switch;

    assert!(switch.target_entity().is_none());
    assert!(!switch.is_synced().await);
    assert!(matches!(
        switch.turn_on().await,
        Err(ControllableError::Resolution(ResolutionError::Unresolved(_)))
    ));
    assert!(stack.host.calls().is_empty());
    assert!(!switch.is_synced().await);
}

#[tokio::test]
async fn should_start_unsynced_when_target_has_not_reported() {
    let stack = stack();
    stack
        .host
        .add_entity(entity("light.new"), None, None, DispatchBehaviour::Apply)
        .unwrap();

    let switch = stack.load("New", "light.new").await.switch;

    assert!(!switch.is_on().await);
    assert!(!switch.is_synced().await);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_migrate_legacy_entry_and_link_device() {
    let stack = stack();
    let device = Device::builder()
        .name("Smart plug")
        .identifier("zigbee", "0x00158d0002")
        .build()
        .unwrap();
    let device_id = device.id;
    stack.host.add_device(device).unwrap();
    for raw in ["sensor.plug_power", "switch.plug"] {
        stack
            .host
            .add_entity(
                entity(raw),
                Some(device_id),
                Some(EntityState::On),
                DispatchBehaviour::Apply,
            )
            .unwrap();
    }

    let outcome = stack
        .service
        .setup_entry(ConfigEntry::new("Plug", Target::Device(device_id)))
        .await
        .unwrap();

    assert!(outcome.migrated);
    assert_eq!(outcome.entry.target_entity(), Some(&entity("switch.plug")));
    let snapshot = outcome.switch.snapshot().await;
    assert_eq!(snapshot.device.map(|link| link.device_id), Some(device_id));
    assert!(snapshot.is_synced);
}

#[tokio::test]
async fn should_stop_reacting_after_unload() {
    let stack = stack();
    stack.add("light.hall", EntityState::On, DispatchBehaviour::Apply);
    let outcome = stack.load("Hall", "light.hall").await;
    let switch = outcome.switch;

    assert!(stack.service.unload_entry(outcome.entry.entry_id).await);
    stack
        .host
        .set_state(&entity("light.hall"), EntityState::Off)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // no listener left to flag the mismatch
    assert!(switch.is_synced().await);
    assert!(!stack.service.registrar().is_target(&entity("light.hall")));
}

#[tokio::test]
async fn should_dump_diagnostics_as_json() {
    let stack = stack();
    stack.add("fan.office", EntityState::Off, DispatchBehaviour::Apply);
    let outcome = stack.load("Office fan", "fan.office").await;

    let diagnostics = stack
        .service
        .diagnostics(outcome.entry.entry_id)
        .await
        .unwrap();
    let json = serde_json::to_value(&diagnostics).unwrap();

    assert_eq!(json["config_entry"]["data"]["target_entity"], "fan.office");
    assert_eq!(json["entities"][0]["device_class"], "switch");
    assert_eq!(json["entities"][0]["state"], "off");
    assert_eq!(json["entities"][0]["attributes"]["is_synced"], true);
    assert_eq!(json["entities"][0]["attributes"]["target_entity"], "fan.office");
}
