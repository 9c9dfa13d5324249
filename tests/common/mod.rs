#![allow(dead_code)]

use ha_bind::{ClientError, InboundMessage, MqttClient};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub last_will: Option<Published>,
    pub connected: bool,
    pub disconnected: bool,
    pub publishes: Vec<Published>,
    pub subscriptions: Vec<String>,
    pub pings: usize,
    pub inbox: VecDeque<InboundMessage>,
    pub fail_connect: bool,
    pub fail_publish: bool,
}

/// In-memory client that records every call. Clones share the same record,
/// so a test keeps one clone while the device owns the other.
#[derive(Clone)]
pub struct RecordingClient {
    keepalive: Duration,
    last_will_topic: Option<String>,
    state: Arc<Mutex<Recorded>>,
}

impl RecordingClient {
    pub fn new(keepalive_secs: u64) -> Self {
        Self {
            keepalive: Duration::from_secs(keepalive_secs),
            last_will_topic: None,
            state: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    pub fn refusing_connection(keepalive_secs: u64) -> Self {
        let client = Self::new(keepalive_secs);
        client.state.lock().fail_connect = true;
        client
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, Recorded> {
        self.state.lock()
    }

    pub fn deliver(&self, topic: &str, payload: &str) {
        self.state
            .lock()
            .inbox
            .push_back(InboundMessage::new(topic, payload.as_bytes()));
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.state.lock().fail_publish = fail;
    }

    pub fn publishes(&self) -> Vec<Published> {
        self.state.lock().publishes.clone()
    }

    pub fn publishes_to(&self, topic: &str) -> Vec<Published> {
        self.publishes()
            .into_iter()
            .filter(|published| published.topic == topic)
            .collect()
    }

    pub fn pings(&self) -> usize {
        self.state.lock().pings
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.state.lock().subscriptions.clone()
    }
}

impl MqttClient for RecordingClient {
    fn keepalive(&self) -> Duration {
        self.keepalive
    }

    fn set_last_will(&mut self, topic: &str, payload: &str, retain: bool) {
        self.last_will_topic = Some(topic.to_string());
        self.state.lock().last_will = Some(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
    }

    fn last_will_topic(&self) -> Option<&str> {
        self.last_will_topic.as_deref()
    }

    fn connect(&mut self) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        if state.fail_connect {
            return Err(ClientError::Connect("connection refused".into()));
        }
        state.connected = true;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        if state.fail_publish {
            return Err(ClientError::Request("publish rejected".into()));
        }
        state.publishes.push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ClientError> {
        self.state.lock().subscriptions.push(topic.to_string());
        Ok(())
    }

    fn ping(&mut self) -> Result<(), ClientError> {
        self.state.lock().pings += 1;
        Ok(())
    }

    fn check_msg(&mut self) -> Result<Vec<InboundMessage>, ClientError> {
        Ok(self.state.lock().inbox.drain(..).collect())
    }

    fn disconnect(&mut self) -> Result<(), ClientError> {
        let mut state = self.state.lock();
        state.connected = false;
        state.disconnected = true;
        Ok(())
    }
}
