use super::discovery::EntityKind;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the decoded payload of a command message.
pub type Action = Arc<dyn Fn(&str) + Send + Sync>;

/// What the device keeps about every registered entity.
pub struct EntityRecord {
    pub unique_id: String,
    pub kind: EntityKind,
    pub discovery_topic: String,
    pub data_topic: String,
    /// Rendered discovery payload, published verbatim on every discovery.
    pub payload: String,
    pub registered: bool,
    pub action: Option<Action>,
}

impl fmt::Debug for EntityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRecord")
            .field("unique_id", &self.unique_id)
            .field("kind", &self.kind)
            .field("data_topic", &self.data_topic)
            .field("registered", &self.registered)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Result of looking up a topic in the table.
pub enum Route {
    /// The first entity on the topic has an action registered.
    Action(Action),
    /// The first entity on the topic has no action.
    NoAction,
    Unmapped,
}

/// Registration-ordered entity table of one device, doubling as the topic to
/// handler mapping used for inbound messages.
#[derive(Debug, Default)]
pub struct EntityTable {
    records: Vec<EntityRecord>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends a record and returns its index.
    pub fn register(&mut self, record: EntityRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EntityRecord> {
        self.records.get(index)
    }

    pub fn set_action(&mut self, index: usize, action: Action) {
        if let Some(record) = self.records.get_mut(index) {
            record.action = Some(action);
        }
    }

    pub fn mark_registered(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.registered = true;
        }
    }

    /// Finds the handler for `topic`. Only the first entity on a topic is ever
    /// considered, so a later entity sharing the topic never receives messages.
    pub fn route(&self, topic: &str) -> Route {
        match self.records.iter().find(|record| record.data_topic == topic) {
            Some(record) => match &record.action {
                Some(action) => Route::Action(Arc::clone(action)),
                None => Route::NoAction,
            },
            None => Route::Unmapped,
        }
    }

    /// `(index, discovery_topic, payload)` for every entity in registration order.
    pub fn discovery_messages(&self) -> Vec<(usize, String, String)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                (
                    index,
                    record.discovery_topic.clone(),
                    record.payload.clone(),
                )
            })
            .collect()
    }

    /// Get all topics that need to be subscribed to
    pub fn subscription_topics(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.action.is_some())
            .map(|record| record.data_topic.clone())
            .collect()
    }
}
