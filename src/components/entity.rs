use serde_json::{Map, Value};
use std::sync::{Arc, Weak};

use crate::error::{Error, Result};
use crate::ha_mqtt::device::DeviceInner;
use crate::ha_mqtt::discovery::{DataTopic, DiscoveryConfig, EntityKind};
use crate::ha_mqtt::handlers::EntityRecord;
use crate::ha_mqtt::topics;
use crate::ha_mqtt::Device;

/// Identity, topics and discovery config shared by every entity platform.
///
/// An entity only holds a weak reference to its [`Device`]; the device owns
/// the entity table and the client.
#[derive(Debug)]
pub struct Entity {
    device: Weak<DeviceInner>,
    index: usize,
    name: String,
    slug: String,
    unique_id: String,
    kind: EntityKind,
    discovery_topic: String,
    data_topic: String,
    config: Map<String, Value>,
}

impl Entity {
    /// Derives topics, renders the discovery config and registers the entity
    /// with `device`.
    ///
    /// The config embeds the device's availability topic, which is only
    /// meaningful once the device is connected, so this fails with
    /// [`Error::NotConnected`] before `Device::connect`.
    pub(crate) fn register(
        device: &Device,
        kind: EntityKind,
        name: &str,
        fields: Value,
    ) -> Result<Self> {
        let shared = device.inner();
        if !shared.is_connected() {
            return Err(Error::NotConnected);
        }

        let slug = topics::slug(name);
        let unique_id = topics::unique_id(shared.id(), &slug);
        let topic_prefix =
            topics::topic_prefix(shared.discovery_prefix(), kind.as_str(), shared.id());
        let discovery_topic = topics::discovery_topic(&topic_prefix, &slug);
        let data_topic = topics::data_topic(&topic_prefix, &slug);

        let config = DiscoveryConfig {
            name: name.to_string(),
            device: shared.metadata().clone(),
            unique_id: unique_id.clone(),
            availability_topic: shared.will_topic().to_string(),
            data_topic: DataTopic::for_kind(kind, data_topic.clone()),
        }
        .into_map(fields)?;
        let payload = serde_json::to_string(&config)?;

        let index = shared.register(EntityRecord {
            unique_id: unique_id.clone(),
            kind,
            discovery_topic: discovery_topic.clone(),
            data_topic: data_topic.clone(),
            payload,
            registered: false,
            action: None,
        });

        Ok(Self {
            device: device.downgrade(),
            index,
            name: name.to_string(),
            slug,
            unique_id,
            kind,
            discovery_topic,
            data_topic,
            config,
        })
    }

    pub(crate) fn device(&self) -> Result<Arc<DeviceInner>> {
        self.device.upgrade().ok_or(Error::DeviceDropped)
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// Publishes this entity's discovery config. Always sends.
    pub fn discover(&self) -> Result<()> {
        self.device()?.discover(self.index)
    }

    /// True once a discovery config has been published for this entity.
    pub fn is_registered(&self) -> bool {
        self.device
            .upgrade()
            .is_some_and(|device| device.is_registered(self.index))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn discovery_topic(&self) -> &str {
        &self.discovery_topic
    }

    /// State topic for sensors, command topic for buttons.
    pub fn topic(&self) -> &str {
        &self.data_topic
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }
}
