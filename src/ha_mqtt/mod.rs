pub mod client;
pub mod device;
pub mod discovery;
pub mod handlers;
pub mod keepalive;
pub mod rumqttc_client;
pub mod topics;

// Re-export the types callers need to wire up a device
pub use client::{InboundMessage, MqttClient};
pub use device::{Device, DeviceBuilder, PAYLOAD_OFFLINE, PAYLOAD_ONLINE};
pub use discovery::EntityKind;
pub use handlers::Action;
pub use keepalive::{Clock, KeepaliveSchedule, ManualClock, SystemClock};
pub use rumqttc_client::RumqttcClient;
