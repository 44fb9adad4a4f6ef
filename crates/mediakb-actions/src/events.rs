use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tracker events returned to the dialogue engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    #[serde(rename = "slot")]
    SlotSet {
        name: String,
        value: Value,
        #[serde(default)]
        timestamp: Option<f64>,
    },
}

impl Event {
    pub fn slot(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Event::SlotSet { name: name.into(), value: value.into(), timestamp: None }
    }

    pub fn reset(name: impl Into<String>) -> Self {
        Self::slot(name, Value::Null)
    }
}
