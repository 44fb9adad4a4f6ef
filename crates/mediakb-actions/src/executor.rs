use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use mediakb_core::error::Error;

use crate::dispatcher::{BotMessage, CollectingDispatcher};
use crate::events::Event;
use crate::tracker::Tracker;

#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    async fn run(
        &self,
        dispatcher: &mut CollectingDispatcher,
        tracker: &Tracker,
        domain: &Value,
    ) -> mediakb_core::error::Result<Vec<Event>>;
}

/// Body of a webhook call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionCall {
    pub next_action: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub domain: Value,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ActionResponse {
    pub events: Vec<Event>,
    pub responses: Vec<BotMessage>,
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("No registered action found for name '{0}'.")]
    ActionNotFound(String),

    #[error("Action '{action}' failed: {source}")]
    ActionFailed { action: String, source: Error },
}

impl ExecutorError {
    pub fn action_name(&self) -> &str {
        match self {
            ExecutorError::ActionNotFound(name) => name,
            ExecutorError::ActionFailed { action, .. } => action,
        }
    }
}

/// Registry of actions, looked up by name for each webhook call.
#[derive(Default)]
pub struct ActionExecutor {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionExecutor {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, action: Arc<dyn Action>) {
        info!(action = action.name(), "registered action");
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    pub async fn run(&self, call: &ActionCall) -> Result<ActionResponse, ExecutorError> {
        let action = self
            .actions
            .get(&call.next_action)
            .ok_or_else(|| ExecutorError::ActionNotFound(call.next_action.clone()))?;
        debug!(action = %call.next_action, sender_id = %call.sender_id, "running action");
        let mut dispatcher = CollectingDispatcher::new();
        let events = action
            .run(&mut dispatcher, &call.tracker, &call.domain)
            .await
            .map_err(|source| ExecutorError::ActionFailed { action: call.next_action.clone(), source })?;
        Ok(ActionResponse { events, responses: dispatcher.messages })
    }
}
