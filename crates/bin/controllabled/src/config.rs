//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `controllable.toml` in the working directory, or at the path in
//! `CONTROLLABLE_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.
//!
//! Besides the daemon settings, the file describes the simulated host
//! (devices, entities and their initial states) and the configuration
//! entries to set up.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use controllable_adapter_memory::DispatchBehaviour;
use controllable_app::switch::SwitchOptions;
use controllable_domain::config_entry::{ConfigEntry, EntryData};
use controllable_domain::entity::{EntityId, EntityState};
use controllable_domain::id::{ConfigEntryId, DeviceId};

const DEFAULT_PATH: &str = "controllable.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Switch behaviour.
    pub switch: SwitchConfig,
    /// Event bus settings.
    pub event_bus: EventBusConfig,
    /// Simulated devices.
    pub devices: Vec<DeviceConfig>,
    /// Simulated entities.
    pub entities: Vec<EntityConfig>,
    /// Configuration entries, one switch each.
    pub entries: Vec<EntryConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// Seed switches as synced when their target has no reading at startup.
    pub assume_synced_when_unavailable: bool,
    /// Per-dispatch timeout in seconds. Unset waits forever.
    pub command_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Broadcast channel capacity.
    pub capacity: usize,
}

/// A simulated device.
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    /// Fixed id, required when a legacy entry targets this device.
    #[serde(default)]
    pub id: Option<DeviceId>,
    pub name: String,
    #[serde(default)]
    pub identifiers: Vec<(String, String)>,
    #[serde(default)]
    pub connections: Vec<(String, String)>,
}

/// A simulated entity.
#[derive(Debug, Deserialize)]
pub struct EntityConfig {
    pub entity_id: EntityId,
    /// Name of the owning device.
    #[serde(default)]
    pub device: Option<String>,
    /// Initial state; unset means the entity has not reported yet.
    #[serde(default)]
    pub state: Option<EntityState>,
    #[serde(default)]
    pub behaviour: DispatchBehaviour,
}

/// A configuration entry.
#[derive(Debug, Deserialize)]
pub struct EntryConfig {
    #[serde(default)]
    pub entry_id: Option<ConfigEntryId>,
    #[serde(flatten)]
    pub data: EntryData,
}

impl Config {
    /// Load configuration from `controllable.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("CONTROLLABLE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CONTROLLABLE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.event_bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "event bus capacity must be non-zero".to_string(),
            ));
        }
        if self.switch.command_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "command timeout must be non-zero when set".to_string(),
            ));
        }

        let mut device_names = HashSet::new();
        for device in &self.devices {
            if !device_names.insert(device.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate device name {:?}",
                    device.name
                )));
            }
        }
        for entity in &self.entities {
            if let Some(device) = &entity.device
                && !device_names.contains(device.as_str())
            {
                return Err(ConfigError::Validation(format!(
                    "entity {} refers to unknown device {device:?}",
                    entity.entity_id
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn switch_options(&self) -> SwitchOptions {
        SwitchOptions {
            assume_synced_when_unavailable: self.switch.assume_synced_when_unavailable,
            command_timeout: self.switch.command_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Configuration entries in file order.
    #[must_use]
    pub fn config_entries(&self) -> Vec<ConfigEntry> {
        self.entries.iter().map(EntryConfig::to_entry).collect()
    }
}

impl EntryConfig {
    fn to_entry(&self) -> ConfigEntry {
        let entry = ConfigEntry::new(self.data.name.clone(), self.data.target.clone());
        match self.entry_id {
            Some(entry_id) => entry.with_entry_id(entry_id),
            None => entry,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "controllabled=info,controllable_app=info".to_string(),
        }
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
