use serde_json::Value;
use std::fmt::Display;
use tracing::debug;

use super::entity::Entity;
use crate::error::Result;
use crate::ha_mqtt::discovery::EntityKind;
use crate::ha_mqtt::Device;

/// An entity that publishes state.
///
/// Consecutive identical values are only sent once, which keeps a signal that
/// is sampled often but changes rarely from flooding the broker.
#[derive(Debug)]
pub struct Sensor {
    entity: Entity,
    last_payload: Option<String>,
}

impl Sensor {
    pub fn new(device: &Device, name: &str) -> Result<Self> {
        Self::with_fields(device, name, Value::Null)
    }

    /// Creates a sensor whose discovery config also carries `fields`
    /// (`device_class`, `unit_of_measurement`, `entity_category`, ...).
    pub fn with_fields(device: &Device, name: &str, fields: Value) -> Result<Self> {
        Ok(Self {
            entity: Entity::register(device, EntityKind::Sensor, name, fields)?,
            last_payload: None,
        })
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn discover(&self) -> Result<()> {
        self.entity.discover()
    }

    pub fn topic(&self) -> &str {
        self.entity.topic()
    }

    /// Last value that was published successfully.
    pub fn last_payload(&self) -> Option<&str> {
        self.last_payload.as_deref()
    }

    /// Publishes `value` to the state topic unless its string form equals the
    /// last published one. Returns whether a message was sent.
    pub fn publish(&mut self, value: impl Display) -> Result<bool> {
        let payload = value.to_string();
        if self.last_payload.as_deref() == Some(payload.as_str()) {
            return Ok(false);
        }

        self.entity
            .device()?
            .publish(self.entity.topic(), payload.as_bytes(), false)?;
        debug!("Sensor '{}' state: {}", self.entity.unique_id(), payload);
        self.last_payload = Some(payload);
        Ok(true)
    }
}

impl AsRef<Entity> for Sensor {
    fn as_ref(&self) -> &Entity {
        &self.entity
    }
}
