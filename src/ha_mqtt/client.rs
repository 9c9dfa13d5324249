use crate::error::ClientError;
use std::time::Duration;

/// A message received from the broker on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Blocking MQTT client the device drives.
///
/// Every call is expected to return within a bounded time; the device never
/// adds timeouts of its own. Implementations own transport concerns such as
/// framing, TLS and reconnection.
pub trait MqttClient: Send {
    /// Keepalive negotiated with the broker.
    fn keepalive(&self) -> Duration;

    /// Installs the message the broker publishes if this client vanishes.
    /// Only takes effect for the next `connect`.
    fn set_last_will(&mut self, topic: &str, payload: &str, retain: bool);

    /// Topic of the installed last will, if any.
    fn last_will_topic(&self) -> Option<&str>;

    fn connect(&mut self) -> Result<(), ClientError>;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ClientError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), ClientError>;

    fn ping(&mut self) -> Result<(), ClientError>;

    /// Returns every message that is already available without waiting for
    /// new ones. An empty vector means nothing is pending.
    fn check_msg(&mut self) -> Result<Vec<InboundMessage>, ClientError>;

    fn disconnect(&mut self) -> Result<(), ClientError> {
        Ok(())
    }
}
