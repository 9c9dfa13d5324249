use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::entity::Entity;
use crate::error::Result;
use crate::ha_mqtt::discovery::EntityKind;
use crate::ha_mqtt::Device;

/// An entity that receives press commands from Home Assistant.
///
/// The command topic has the same shape as a sensor's state topic
/// (`.../button/<device>/state/<slug>`); the `kind` segment keeps the two apart.
#[derive(Debug)]
pub struct Button {
    entity: Entity,
}

impl Button {
    pub fn new(device: &Device, name: &str) -> Result<Self> {
        Self::with_fields(device, name, Value::Null)
    }

    pub fn with_fields(device: &Device, name: &str, fields: Value) -> Result<Self> {
        Ok(Self {
            entity: Entity::register(device, EntityKind::Button, name, fields)?,
        })
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn discover(&self) -> Result<()> {
        self.entity.discover()
    }

    /// Command topic this button listens on.
    pub fn topic(&self) -> &str {
        self.entity.topic()
    }

    /// Subscribes to the command topic and registers `action`, which is called
    /// with the decoded payload of every message on it.
    ///
    /// Calling this again subscribes again and replaces the previous action.
    pub fn set_action<F>(&self, action: F) -> Result<()>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let device = self.entity.device()?;
        device.subscribe(self.entity.topic())?;
        device.set_action(self.entity.index(), Arc::new(action));
        info!(
            "Button '{}' listening on '{}'",
            self.entity.name(),
            self.entity.topic()
        );
        Ok(())
    }
}

impl AsRef<Entity> for Button {
    fn as_ref(&self) -> &Entity {
        &self.entity
    }
}
