//! The device: owner of the client binding, the entity table and the
//! keepalive schedule.
//!
//! A [`Device`] is a cheap handle around shared state. Entities keep a weak
//! reference back to it and reach the client through it, so every call that
//! touches the client is serialized by one lock, whether it comes from the
//! run loop or from a timer thread publishing a sensor value.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

use super::client::MqttClient;
use super::discovery::device_metadata;
use super::handlers::{Action, EntityRecord, EntityTable, Route};
use super::keepalive::{Clock, KeepaliveSchedule, SystemClock};
use super::topics::{availability_topic, slug, DEFAULT_DISCOVERY_PREFIX};
use crate::error::{ClientError, Error, Result};

pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";

/// Bound client plus its keepalive bookkeeping.
struct Link {
    client: Box<dyn MqttClient>,
    keepalive: KeepaliveSchedule,
}

pub(crate) struct DeviceInner {
    name: String,
    id: String,
    discovery_prefix: String,
    will_topic: String,
    metadata: Map<String, Value>,
    clock: Arc<dyn Clock>,
    link: Mutex<Option<Link>>,
    entities: Mutex<EntityTable>,
}

impl DeviceInner {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn discovery_prefix(&self) -> &str {
        &self.discovery_prefix
    }

    pub(crate) fn will_topic(&self) -> &str {
        &self.will_topic
    }

    pub(crate) fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.link.lock().is_some()
    }

    /// Runs `f` against the bound client while holding the client lock.
    fn with_client<T>(
        &self,
        f: impl FnOnce(&mut (dyn MqttClient + 'static)) -> std::result::Result<T, ClientError>,
    ) -> Result<T> {
        let mut link = self.link.lock();
        let link = link.as_mut().ok_or(Error::NotConnected)?;
        Ok(f(&mut *link.client)?)
    }

    pub(crate) fn publish(&self, topic: &str, payload: &[u8], retain: bool) -> Result<()> {
        debug!("Publishing to '{}' (retain={})", topic, retain);
        self.with_client(|client| client.publish(topic, payload, retain))
    }

    pub(crate) fn subscribe(&self, topic: &str) -> Result<()> {
        debug!("Subscribing to '{}'", topic);
        self.with_client(|client| client.subscribe(topic))
    }

    pub(crate) fn register(&self, record: EntityRecord) -> usize {
        debug!(
            "Registering {} entity '{}' on '{}'",
            record.kind, record.unique_id, record.data_topic
        );
        self.entities.lock().register(record)
    }

    pub(crate) fn set_action(&self, index: usize, action: Action) {
        self.entities.lock().set_action(index, action);
    }

    pub(crate) fn is_registered(&self, index: usize) -> bool {
        self.entities
            .lock()
            .get(index)
            .is_some_and(|record| record.registered)
    }

    /// Publishes the discovery payload of one entity and marks it registered.
    pub(crate) fn discover(&self, index: usize) -> Result<()> {
        let message = self
            .entities
            .lock()
            .get(index)
            .map(|record| (record.discovery_topic.clone(), record.payload.clone()));

        if let Some((topic, payload)) = message {
            debug!("Discovery payload: {}", payload);
            self.publish(&topic, payload.as_bytes(), false)?;
            self.entities.lock().mark_registered(index);
        }
        Ok(())
    }
}

/// A device as seen by Home Assistant: a named group of entities sharing one
/// availability topic and one MQTT client.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("will_topic", &self.inner.will_topic)
            .field("connected", &self.inner.is_connected())
            .finish()
    }
}

impl Device {
    /// Creates a device with the default discovery prefix and no extra metadata.
    pub fn new(name: &str) -> Self {
        DeviceBuilder::new(name).build()
    }

    pub fn builder(name: &str) -> DeviceBuilder {
        DeviceBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn discovery_prefix(&self) -> &str {
        &self.inner.discovery_prefix
    }

    pub fn will_topic(&self) -> &str {
        &self.inner.will_topic
    }

    /// The `dev` block embedded in every entity's discovery payload.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.inner.metadata
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    pub fn entity_count(&self) -> usize {
        self.inner.entities.lock().len()
    }

    pub(crate) fn downgrade(&self) -> Weak<DeviceInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn inner(&self) -> &DeviceInner {
        &self.inner
    }

    /// Binds `client`, installs the retained "offline" last will, connects and
    /// announces "online" (retained) on the availability topic.
    ///
    /// Entities can only be created once this has succeeded. A connection
    /// failure is returned as is and leaves the device unbound.
    pub fn connect(&self, client: impl MqttClient + 'static) -> Result<()> {
        let mut client: Box<dyn MqttClient> = Box::new(client);
        let keepalive = KeepaliveSchedule::new(client.keepalive(), self.inner.clock.now());

        client.set_last_will(&self.inner.will_topic, PAYLOAD_OFFLINE, true);
        debug!("Last will installed on {:?}", client.last_will_topic());
        info!("Connecting device '{}' to MQTT broker", self.inner.id);
        client.connect()?;
        client.publish(&self.inner.will_topic, PAYLOAD_ONLINE.as_bytes(), true)?;

        debug!(
            "Device '{}' connected, ping interval {:?}",
            self.inner.id,
            keepalive.interval()
        );
        *self.inner.link.lock() = Some(Link { client, keepalive });
        Ok(())
    }

    /// Republishes the retained "online" availability message.
    pub fn announce_online(&self) -> Result<()> {
        self.inner
            .publish(&self.inner.will_topic, PAYLOAD_ONLINE.as_bytes(), true)
    }

    /// Publishes the discovery payload of every entity in registration order.
    ///
    /// Safe to call repeatedly; the payloads are identical every time.
    pub fn discover_all(&self) -> Result<()> {
        let messages = self.inner.entities.lock().discovery_messages();
        info!(
            "Publishing discovery for {} entities of '{}'",
            messages.len(),
            self.inner.id
        );

        for (index, topic, payload) in messages {
            self.inner.publish(&topic, payload.as_bytes(), false)?;
            self.inner.entities.lock().mark_registered(index);
        }
        Ok(())
    }

    /// Re-issues the subscription of every entity that has an action.
    /// Returns the number of topics subscribed.
    pub fn resubscribe_all(&self) -> Result<usize> {
        let topics = self.inner.entities.lock().subscription_topics();
        for topic in &topics {
            self.inner.subscribe(topic)?;
        }
        Ok(topics.len())
    }

    /// Dispatches one inbound message to the entity owning `topic`.
    ///
    /// Returns true if an action was invoked. Messages on unknown topics, or
    /// for entities without an action, are dropped silently.
    pub fn route_inbound(&self, topic: &str, payload: &[u8]) -> bool {
        let route = self.inner.entities.lock().route(topic);
        match route {
            Route::Action(action) => {
                let payload: Cow<'_, str> = String::from_utf8_lossy(payload);
                debug!("Dispatching message on '{}': {}", topic, payload);
                action(&payload);
                true
            }
            Route::NoAction => {
                debug!("No action registered for '{}'", topic);
                false
            }
            Route::Unmapped => false,
        }
    }

    /// One step of the run loop: ping the broker if the keepalive interval has
    /// elapsed, then drain and dispatch every message already received.
    ///
    /// Never waits for new messages. Without a bound client this returns
    /// immediately. Returns the number of messages handed to an action.
    pub fn tick(&self) -> Result<usize> {
        let now = self.inner.clock.now();
        let messages = {
            let mut link = self.inner.link.lock();
            let Some(link) = link.as_mut() else {
                return Ok(0);
            };

            if link.keepalive.is_due(now) {
                debug!("Sending keepalive ping");
                link.client.ping()?;
                link.keepalive.record_ping(now);
            }

            link.client.check_msg()?
        };

        let mut dispatched = 0;
        for message in messages {
            if self.route_inbound(&message.topic, &message.payload) {
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    /// Announces "offline" (retained), disconnects and unbinds the client.
    pub fn shutdown(&self) -> Result<()> {
        let Some(mut link) = self.inner.link.lock().take() else {
            return Err(Error::NotConnected);
        };

        info!("Shutting down device '{}'", self.inner.id);
        link.client
            .publish(&self.inner.will_topic, PAYLOAD_OFFLINE.as_bytes(), true)?;
        link.client.disconnect()?;
        Ok(())
    }
}

/// Configures a [`Device`] before it is shared with entities.
pub struct DeviceBuilder {
    name: String,
    discovery_prefix: String,
    descriptors: Map<String, Value>,
    clock: Arc<dyn Clock>,
}

impl DeviceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_string(),
            descriptors: Map::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn discovery_prefix(mut self, prefix: &str) -> Self {
        self.discovery_prefix = prefix.to_string();
        self
    }

    /// Adds a device descriptor (manufacturer, model, sw version, ...).
    pub fn metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.descriptors.insert(key.to_string(), value.into());
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Device {
        let id = slug(&self.name);
        let will_topic = availability_topic(&self.discovery_prefix, &id);
        let metadata = device_metadata(self.descriptors, &self.name, &id);

        Device {
            inner: Arc::new(DeviceInner {
                name: self.name,
                id,
                discovery_prefix: self.discovery_prefix,
                will_topic,
                metadata,
                clock: self.clock,
                link: Mutex::new(None),
                entities: Mutex::new(EntityTable::new()),
            }),
        }
    }
}
