use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One bot message in the webhook response. A domain response is sent under
/// both `template` and `response` so older and newer engines pick it up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotMessage {
    pub text: Option<String>,
    pub template: Option<String>,
    pub response: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Value>,
    #[serde(default)]
    pub elements: Vec<Value>,
    #[serde(default)]
    pub custom: Map<String, Value>,
    pub image: Option<String>,
    pub attachment: Option<String>,
}

#[derive(Debug, Default)]
pub struct CollectingDispatcher {
    pub messages: Vec<BotMessage>,
}

impl CollectingDispatcher {
    pub fn new() -> Self { Self::default() }

    pub fn utter_text(&mut self, text: impl Into<String>) {
        self.messages.push(BotMessage { text: Some(text.into()), ..Default::default() });
    }

    pub fn utter_response(&mut self, name: &str) {
        self.messages.push(BotMessage {
            template: Some(name.to_string()),
            response: Some(name.to_string()),
            ..Default::default()
        });
    }

    /// Texts uttered so far, skipping domain responses.
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().filter_map(|m| m.text.as_deref()).collect()
    }
}
