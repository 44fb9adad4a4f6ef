//! Conversation state as sent by the dialogue engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use mediakb_core::types::display_value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub entity: String,
    pub value: Value,
    pub role: Option<String>,
    pub group: Option<String>,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatestMessage {
    pub text: Option<String>,
    pub intent: Value,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tracker {
    pub sender_id: String,
    pub slots: Map<String, Value>,
    pub latest_message: LatestMessage,
    pub latest_action_name: Option<String>,
    pub events: Vec<Value>,
}

impl Tracker {
    /// The slot value, `None` when unset or null.
    pub fn get_slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|v| !v.is_null())
    }

    /// The slot rendered as text; empty strings count as unset.
    pub fn slot_text(&self, name: &str) -> Option<String> {
        self.get_slot(name).and_then(display_value).filter(|s| !s.is_empty())
    }

    /// Role of the latest-message entity that filled `entity` with `value`.
    pub fn entity_role(&self, entity: &str, value: &Value) -> Option<&str> {
        self.latest_message
            .entities
            .iter()
            .find(|e| e.entity == entity && &e.value == value && e.role.is_some())
            .and_then(|e| e.role.as_deref())
    }

    pub fn with_slot(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.slots.insert(name.to_string(), value.into());
        self
    }
}
