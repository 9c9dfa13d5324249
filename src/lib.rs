//! Device-side Home Assistant MQTT discovery.
//!
//! A [`Device`] binds a blocking [`MqttClient`], announces its availability and
//! owns a table of entities. [`Sensor`]s publish de-duplicated state,
//! [`Button`]s receive commands through actions, and [`Device::tick`] is the
//! cooperative step that keeps the connection alive and dispatches inbound
//! messages.
//!
//! ```no_run
//! use ha_bind::{Button, Device, RumqttcClient, Sensor};
//! use rumqttc::MqttOptions;
//! use serde_json::json;
//!
//! # fn main() -> ha_bind::Result<()> {
//! let device = Device::builder("Device Name").metadata("mf", "Acme").build();
//! device.connect(RumqttcClient::new(MqttOptions::new(device.id(), "broker", 1883))?)?;
//!
//! let identify = Button::with_fields(&device, "Identify", json!({"entity_category": "config"}))?;
//! identify.set_action(|payload| println!("identify: {payload}"))?;
//! let mut cpu = Sensor::with_fields(&device, "CPU Frequency", json!({"unit_of_measurement": "MHz"}))?;
//!
//! device.discover_all()?;
//! cpu.publish(240)?;
//! loop {
//!     device.tick()?;
//! }
//! # }
//! ```

pub mod components;
pub mod error;
pub mod ha_mqtt;

pub use components::{Button, Entity, Sensor};
pub use error::{ClientError, Error, Result};
pub use ha_mqtt::{
    Clock, Device, DeviceBuilder, EntityKind, InboundMessage, ManualClock, MqttClient,
    RumqttcClient, SystemClock,
};
