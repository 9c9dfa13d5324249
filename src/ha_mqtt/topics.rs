//! Identifier and topic derivation.
//!
//! All functions here are pure string templates. Names are not validated for
//! MQTT wildcard or separator characters (`/`, `+`, `#`); callers are expected
//! to supply names free of them.

/// Default Home Assistant discovery prefix.
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";

/// Turns a human readable name into an identifier: lowercase, spaces become `_`.
///
/// No other punctuation is touched, so `slug(slug(x)) == slug(x)`.
pub fn slug(text: &str) -> String {
    text.to_lowercase().replace(' ', "_")
}

/// Availability (last will) topic of a device.
pub fn availability_topic(discovery_prefix: &str, device_id: &str) -> String {
    format!("{}/availability/{}", discovery_prefix, device_id)
}

/// Common prefix of every topic that belongs to one entity kind on one device.
pub fn topic_prefix(discovery_prefix: &str, kind: &str, device_id: &str) -> String {
    format!("{}/{}/{}", discovery_prefix, kind, device_id)
}

/// Topic the discovery config of an entity is published to.
pub fn discovery_topic(topic_prefix: &str, slug: &str) -> String {
    format!("{}/{}/config", topic_prefix, slug)
}

/// State topic of a sensor, command topic of a button.
pub fn data_topic(topic_prefix: &str, slug: &str) -> String {
    format!("{}/state/{}", topic_prefix, slug)
}

pub fn unique_id(device_id: &str, slug: &str) -> String {
    format!("{}_{}", device_id, slug)
}
