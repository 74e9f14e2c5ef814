//! Diagnostics dump for one configuration entry.

use serde::{Deserialize, Serialize};

use crate::config_entry::{ConfigEntry, EntryData};
use crate::id::ConfigEntryId;
use crate::switch::SwitchSnapshot;

/// The entry itself plus the state of every live controllable switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDiagnostics {
    pub config_entry: EntrySummary,
    pub entities: Vec<EntityDiagnostics>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub entry_id: ConfigEntryId,
    pub data: EntryData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDiagnostics {
    pub unique_id: String,
    pub device_class: String,
    pub state: String,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl EntryDiagnostics {
    #[must_use]
    pub fn new(entry: &ConfigEntry, switches: &[SwitchSnapshot]) -> Self {
        Self {
            config_entry: EntrySummary {
                entry_id: entry.entry_id,
                data: entry.data.clone(),
            },
            entities: switches.iter().map(EntityDiagnostics::from).collect(),
        }
    }
}

impl From<&SwitchSnapshot> for EntityDiagnostics {
    fn from(snapshot: &SwitchSnapshot) -> Self {
        Self {
            unique_id: snapshot.unique_id.clone(),
            device_class: SwitchSnapshot::DEVICE_CLASS.to_string(),
            state: if snapshot.is_on { "on" } else { "off" }.to_string(),
            attributes: snapshot.attributes(),
        }
    }
}
