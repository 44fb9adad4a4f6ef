//! Domain types shared by the knowledge-base backends and the action.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type ObjectId = String;

/// Comparison requested for a range attribute, taken from the entity role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeRole {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeRole {
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "eq" => Some(Self::Eq),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
        }
    }
}

/// One attribute constraint extracted from the conversation slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub name: String,
    pub value: String,
    pub role: Option<RangeRole>,
}

impl AttributeFilter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), role: None }
    }

    pub fn with_role(mut self, role: RangeRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// A document as seen by the action.
///
/// - `id`: the key attribute, identical to the index document id
/// - `name`: human representation rendered by the document type
/// - `attributes`: every attribute of the type; absent fields are `null`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbObject {
    pub id: ObjectId,
    pub name: String,
    pub attributes: Map<String, Value>,
}

impl KbObject {
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        match attribute {
            "id" | "name" => None,
            _ => self.attributes.get(attribute),
        }
    }
}

/// Renders a JSON value the way it should read in an utterance.
/// `null` has no rendering.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items.iter().filter_map(display_value).collect::<Vec<_>>().join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_value_flattens_lists() {
        assert_eq!(display_value(&json!(["Drama", "Romance"])).as_deref(), Some("Drama, Romance"));
        assert_eq!(display_value(&json!(7.5)).as_deref(), Some("7.5"));
        assert_eq!(display_value(&Value::Null), None);
    }

    #[test]
    fn range_role_round_trips_names() {
        for role in ["eq", "gt", "gte", "lt", "lte"] {
            assert_eq!(RangeRole::parse(role).map(RangeRole::as_str), Some(role));
        }
        assert_eq!(RangeRole::parse("between"), None);
    }
}
