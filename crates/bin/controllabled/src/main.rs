//! # controllabled — controllable switch daemon
//!
//! Composition root that wires the in-memory host, the event bus and the
//! entry service together, then runs until interrupted.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Populate the simulated host with the configured devices and entities
//! - Set up every configured entry and report migrated ones
//! - Log every switch update
//! - Unload all entries on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod fixture;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use controllable_adapter_memory::InMemoryHost;
use controllable_app::event_bus::{InProcessEventBus, ListenerHandle};
use controllable_app::ports::EventSubscriber;
use controllable_app::services::EntryService;
use controllable_domain::event::EventKind;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Event bus
    let bus = Arc::new(InProcessEventBus::new(config.event_bus.capacity));

    // Host
    let host = Arc::new(InMemoryHost::new(Arc::clone(&bus)));
    fixture::populate(&host, &config).context("failed to populate simulated host")?;

    let _updates = log_switch_updates(&bus);

    // Entries
    let service = EntryService::new(
        Arc::clone(&host),
        Arc::clone(&host),
        Arc::clone(&host),
        Arc::clone(&bus),
        config.switch_options(),
    );
    for entry in config.config_entries() {
        let entry_id = entry.entry_id;
        match service.setup_entry(entry).await {
            Ok(outcome) if outcome.migrated => {
                let data = serde_json::to_string(&outcome.entry.data)?;
                tracing::info!(%entry_id, %data, "entry migrated, update the configuration file");
            }
            Ok(_) => {}
            Err(err) => tracing::error!(%entry_id, error = %err, "failed to set up entry"),
        }
    }
    tracing::info!(
        entries = service.loaded_entries().await.len(),
        "controllabled running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("shutting down");
    service.shutdown().await;
    Ok(())
}

fn log_switch_updates(bus: &InProcessEventBus) -> ListenerHandle {
    ListenerHandle::spawn("switch_update_log", bus.subscribe(), |event| async move {
        if let EventKind::SwitchUpdated { snapshot } = event.kind {
            tracing::info!(
                unique_id = %snapshot.unique_id,
                is_on = snapshot.is_on,
                is_synced = snapshot.is_synced,
                target_entity = ?snapshot.target_entity,
                "switch updated"
            );
        }
    })
}
