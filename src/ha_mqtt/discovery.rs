use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Platform an entity is announced under; fixed for the lifetime of the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Sensor,
    Button,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Sensor => "sensor",
            EntityKind::Button => "button",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The topic an entity exchanges data on, keyed the way Home Assistant expects
/// for the entity's platform.
#[derive(Serialize, Clone, Debug)]
#[serde(untagged)]
pub enum DataTopic {
    State {
        #[serde(rename = "stat_t")]
        state_topic: String,
    },
    Command {
        #[serde(rename = "cmd_t")]
        command_topic: String,
    },
}

impl DataTopic {
    pub fn for_kind(kind: EntityKind, topic: String) -> Self {
        match kind {
            EntityKind::Sensor => DataTopic::State { state_topic: topic },
            EntityKind::Button => DataTopic::Command {
                command_topic: topic,
            },
        }
    }
}

/// Base discovery config shared by every entity platform.
#[derive(Serialize, Clone, Debug)]
pub struct DiscoveryConfig {
    pub name: String,
    #[serde(rename = "dev")]
    pub device: Map<String, Value>,
    #[serde(rename = "uniq_id")]
    pub unique_id: String,
    #[serde(rename = "avty_t")]
    pub availability_topic: String,
    #[serde(flatten)]
    pub data_topic: DataTopic,
}

impl DiscoveryConfig {
    /// Renders the config as an ordered JSON object and merges caller supplied
    /// fields on top of it. Extra fields replace base keys of the same name.
    ///
    /// Extra fields are not validated; anything other than a JSON object (or
    /// `null`) is dropped with a warning.
    pub fn into_map(self, extra: Value) -> Result<Map<String, Value>, serde_json::Error> {
        let mut config = match serde_json::to_value(&self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        match extra {
            Value::Object(fields) => {
                for (key, value) in fields {
                    config.insert(key, value);
                }
            }
            Value::Null => {}
            other => {
                warn!(
                    "Ignoring non-object discovery fields for '{}': {}",
                    self.name, other
                );
            }
        }

        Ok(config)
    }
}

/// Builds the `dev` block embedded in every discovery payload of a device.
///
/// `name` and `ids` are always set from the device itself and win over any
/// caller supplied values.
pub fn device_metadata(
    descriptors: Map<String, Value>,
    name: &str,
    id: &str,
) -> Map<String, Value> {
    let mut metadata = descriptors;
    metadata.insert("name".to_string(), Value::String(name.to_string()));
    metadata.insert("ids".to_string(), Value::String(id.to_string()));
    metadata
}
