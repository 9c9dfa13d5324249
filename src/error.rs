//! Error types for the binding layer.
//!
//! Normal operation never produces an error: publishing an unchanged sensor
//! value, republishing discovery and receiving messages on unknown topics are
//! all successful no-ops. Errors come from the MQTT client collaborator or
//! from calling into a device that is not (or no longer) connected.

use thiserror::Error;

/// Boxed error carried by [`ClientError`] variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by an [`MqttClient`](crate::MqttClient) implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The broker connection could not be established.
    #[error("failed to connect to broker: {0}")]
    Connect(#[source] BoxError),

    /// The client refused to queue a publish or subscribe request.
    #[error("request rejected by client: {0}")]
    Request(#[source] BoxError),

    /// An established connection failed while being driven.
    #[error("connection error: {0}")]
    Connection(#[source] BoxError),
}

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// No client is bound to the device yet (or it was shut down).
    #[error("device is not connected to a broker")]
    NotConnected,

    /// The device an entity belongs to has been dropped.
    #[error("owning device has been dropped")]
    DeviceDropped,

    /// The MQTT client collaborator failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A discovery payload could not be rendered as JSON.
    #[error("failed to serialize discovery payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;
