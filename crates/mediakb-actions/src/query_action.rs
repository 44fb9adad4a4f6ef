//! The `action_query_knowledge_base` custom action.
//!
//! Depending on the slots it either lists objects of a type filtered by
//! the attribute slots, answers one attribute of a single object, or joins
//! an object of the previous type to the same key in a new type (e.g. the
//! rating of a listed movie). Every invocation reports an [`Outcome`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info, warn};

use mediakb_core::config::ActionConfig;
use mediakb_core::error::Result;
use mediakb_core::slots::{
    ACTION_QUERY_KNOWLEDGE_BASE, RESPONSE_ASK_REPHRASE, RESPONSE_KB_UNAVAILABLE, SLOT_ATTRIBUTE, SLOT_LAST_OBJECT,
    SLOT_LAST_OBJECT_TYPE, SLOT_LIMIT, SLOT_LISTED_OBJECTS, SLOT_MENTION, SLOT_OBJECT_TYPE,
};
use mediakb_core::traits::KnowledgeBase;
use mediakb_core::types::{display_value, AttributeFilter, KbObject, RangeRole};

use crate::dispatcher::CollectingDispatcher;
use crate::events::Event;
use crate::executor::Action;
use crate::mention::object_name;
use crate::tracker::Tracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Found,
    NotFound,
    Incomplete,
    Failed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Found => "found",
            Outcome::NotFound => "not_found",
            Outcome::Incomplete => "incomplete",
            Outcome::Failed => "failed",
        }
    }
}

struct Reply {
    events: Vec<Event>,
    outcome: Outcome,
}

impl Reply {
    fn new(events: Vec<Event>, outcome: Outcome) -> Self { Self { events, outcome } }
}

pub struct ActionQueryKnowledgeBase {
    kb: Arc<dyn KnowledgeBase>,
    config: ActionConfig,
}

/// Strips the brackets list and map values carry in their text form.
fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '{' | '}' | '[' | ']')).collect()
}

/// Attribute slots that currently hold a value, with the role of the
/// entity that set them.
pub fn attribute_filters(tracker: &Tracker, attributes: &[String]) -> Vec<AttributeFilter> {
    attributes
        .iter()
        .filter_map(|attr| {
            let raw = tracker.get_slot(attr)?;
            let value = display_value(raw)?;
            let filter = AttributeFilter::new(attr.as_str(), value);
            Some(match tracker.entity_role(attr, raw).and_then(RangeRole::parse) {
                Some(role) => filter.with_role(role),
                None => filter,
            })
        })
        .collect()
}

fn reset_attribute_slots(tracker: &Tracker, attributes: &[String]) -> Vec<Event> {
    attributes.iter().filter(|a| tracker.get_slot(a).is_some()).map(|a| Event::reset(a.as_str())).collect()
}

fn attributes_repr(filters: &[AttributeFilter]) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = filters.iter().map(|f| format!("{}: {}", f.name, f.value)).collect();
    format!(" with {}", parts.join(", "))
}

impl ActionQueryKnowledgeBase {
    pub fn new(kb: Arc<dyn KnowledgeBase>, config: ActionConfig) -> Self {
        Self { kb, config }
    }

    /// The `limit` slot when it holds a positive number, else the default.
    fn limit(&self, tracker: &Tracker) -> usize {
        let Some(raw) = tracker.get_slot(SLOT_LIMIT) else {
            return self.config.default_limit;
        };
        let parsed = match raw {
            Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<usize>().ok(),
            _ => None,
        };
        match parsed.filter(|n| *n > 0) {
            Some(n) => n,
            None => {
                warn!(limit = %raw, "ignoring unusable limit slot");
                self.config.default_limit
            }
        }
    }

    async fn query(&self, dispatcher: &mut CollectingDispatcher, tracker: &Tracker, object_type: &str) -> Result<Reply> {
        let last_object_type = tracker.slot_text(SLOT_LAST_OBJECT_TYPE);
        let has_mention = tracker.slot_text(SLOT_MENTION).is_some();
        match (last_object_type, tracker.slot_text(SLOT_ATTRIBUTE)) {
            (Some(last), _) if last != object_type && has_mention => {
                self.query_join(dispatcher, tracker, object_type, &last).await
            }
            (_, None) => self.query_objects(dispatcher, tracker, object_type).await,
            (_, Some(attribute)) => self.query_attribute(dispatcher, tracker, object_type, &attribute).await,
        }
    }

    async fn query_objects(&self, dispatcher: &mut CollectingDispatcher, tracker: &Tracker, object_type: &str) -> Result<Reply> {
        let attributes = self.kb.attributes_of(object_type);
        let filters = attribute_filters(tracker, &attributes);
        let limit = self.limit(tracker);
        info!(object_type, limit, filters = filters.len(), "listing objects");
        let objects = self.kb.get_objects(object_type, &filters, limit).await?;
        let repr = attributes_repr(&filters);
        let reset = reset_attribute_slots(tracker, &attributes);

        if objects.is_empty() {
            dispatcher.utter_text(format!("I could not find any {}s{}.", object_type, repr));
            return Ok(Reply::new(reset, Outcome::NotFound));
        }

        dispatcher.utter_text(format!("I found the following {}s{}:", object_type, repr));
        for (i, obj) in objects.iter().enumerate() {
            dispatcher.utter_text(format!("{}: {}", i + 1, obj.name));
        }
        let last_object = match objects.as_slice() {
            [only] => Value::from(only.id.clone()),
            _ => Value::Null,
        };
        let listed: Vec<Value> = objects.iter().map(|o| Value::from(o.id.clone())).collect();
        let mut events = vec![
            Event::slot(SLOT_OBJECT_TYPE, object_type),
            Event::reset(SLOT_MENTION),
            Event::reset(SLOT_ATTRIBUTE),
            Event::slot(SLOT_LAST_OBJECT, last_object),
            Event::slot(SLOT_LAST_OBJECT_TYPE, object_type),
            Event::slot(SLOT_LISTED_OBJECTS, listed),
            Event::reset(SLOT_LIMIT),
        ];
        events.extend(reset);
        Ok(Reply::new(events, Outcome::Found))
    }

    async fn query_attribute(
        &self,
        dispatcher: &mut CollectingDispatcher,
        tracker: &Tracker,
        object_type: &str,
        attribute: &str,
    ) -> Result<Reply> {
        let Some(name) = object_name(tracker, self.config.use_last_object_mention) else {
            dispatcher.utter_response(RESPONSE_ASK_REPHRASE);
            return Ok(Reply::new(vec![Event::reset(SLOT_MENTION)], Outcome::Incomplete));
        };
        if !self.kb.attributes_of(object_type).iter().any(|a| a == attribute) {
            dispatcher.utter_response(RESPONSE_ASK_REPHRASE);
            return Ok(Reply::new(vec![Event::reset(SLOT_MENTION)], Outcome::Incomplete));
        }
        let Some(object) = self.kb.get_object(object_type, &name).await? else {
            dispatcher.utter_response(RESPONSE_ASK_REPHRASE);
            return Ok(Reply::new(vec![Event::reset(SLOT_MENTION)], Outcome::NotFound));
        };

        let value = object.get(attribute).and_then(display_value).filter(|v| !v.is_empty());
        let outcome = match value {
            Some(v) => {
                dispatcher.utter_text(format!("{}.", sanitize(&v)));
                Outcome::Found
            }
            None => {
                dispatcher.utter_text(format!(
                    "Did not find a valid value for attribute '{}' for object '{}'.",
                    attribute, object.name
                ));
                Outcome::NotFound
            }
        };
        let events = vec![
            Event::slot(SLOT_OBJECT_TYPE, object_type),
            Event::reset(SLOT_ATTRIBUTE),
            Event::reset(SLOT_MENTION),
            Event::slot(SLOT_LAST_OBJECT, object.id.clone()),
            Event::slot(SLOT_LAST_OBJECT_TYPE, object_type),
        ];
        Ok(Reply::new(events, outcome))
    }

    async fn query_join(
        &self,
        dispatcher: &mut CollectingDispatcher,
        tracker: &Tracker,
        object_type: &str,
        last_object_type: &str,
    ) -> Result<Reply> {
        let Some(name) = object_name(tracker, self.config.use_last_object_mention) else {
            dispatcher.utter_response(RESPONSE_ASK_REPHRASE);
            return Ok(Reply::new(vec![Event::reset(SLOT_MENTION)], Outcome::Incomplete));
        };
        let Some(last_object) = self.kb.get_object(last_object_type, &name).await? else {
            dispatcher.utter_response(RESPONSE_ASK_REPHRASE);
            return Ok(Reply::new(vec![Event::reset(SLOT_MENTION)], Outcome::NotFound));
        };
        let Some(object) = self.kb.get_object(object_type, &name).await? else {
            dispatcher.utter_text(format!(
                "I could not find the {} for {} {}.",
                object_type, last_object_type, last_object.name
            ));
            return Ok(Reply::new(vec![Event::reset(SLOT_MENTION)], Outcome::NotFound));
        };

        dispatcher.utter_text(join_sentence(&object, object_type, last_object_type, &last_object));
        let events = vec![
            Event::slot(SLOT_OBJECT_TYPE, last_object_type),
            Event::reset(SLOT_MENTION),
            Event::reset(SLOT_ATTRIBUTE),
            Event::slot(SLOT_LAST_OBJECT, name),
            Event::slot(SLOT_LAST_OBJECT_TYPE, last_object_type),
            Event::reset(SLOT_LIMIT),
        ];
        Ok(Reply::new(events, Outcome::Found))
    }
}

fn join_sentence(object: &KbObject, object_type: &str, last_object_type: &str, last_object: &KbObject) -> String {
    format!("{} is the {} for {} {}.", object.name, object_type, last_object_type, last_object.name)
}

#[async_trait]
impl Action for ActionQueryKnowledgeBase {
    fn name(&self) -> &str {
        ACTION_QUERY_KNOWLEDGE_BASE
    }

    async fn run(&self, dispatcher: &mut CollectingDispatcher, tracker: &Tracker, _domain: &Value) -> Result<Vec<Event>> {
        let object_type = tracker
            .slot_text(SLOT_OBJECT_TYPE)
            .filter(|t| self.kb.document_type(t).is_some());

        let reply = match object_type {
            None => {
                dispatcher.utter_response(RESPONSE_ASK_REPHRASE);
                Reply::new(Vec::new(), Outcome::Incomplete)
            }
            Some(object_type) => match self.query(dispatcher, tracker, &object_type).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(object_type = %object_type, error = %e, "knowledge base query failed");
                    dispatcher.utter_response(RESPONSE_KB_UNAVAILABLE);
                    Reply::new(vec![Event::reset(SLOT_MENTION)], Outcome::Failed)
                }
            },
        };

        info!(outcome = reply.outcome.as_str(), "knowledge base action done");
        let mut events = reply.events;
        if let Some(slot) = self.config.outcome_slot() {
            events.push(Event::slot(slot, reply.outcome.as_str()));
        }
        Ok(events)
    }
}
