//! Query DSL builders.
//!
//! Each attribute filter becomes one clause of a `bool.must` query; the
//! clause type follows the attribute kind and, for range attributes, the
//! role of the entity that filled the slot.

use serde_json::{json, Value};

use mediakb_core::error::{Error, Result};
use mediakb_core::schema::{AttributeKind, DocumentType};
use mediakb_core::types::{AttributeFilter, RangeRole};

pub fn match_query(field: &str, value: &str) -> Value {
	json!({ "match": { field: value } })
}

pub fn match_phrase(field: &str, value: &str) -> Value {
	json!({ "match_phrase": { field: value } })
}

/// Bounded comparison; numeric-looking values are sent as numbers.
pub fn range(field: &str, role: RangeRole, value: &str) -> Value {
	json!({ "range": { field: { role.as_str(): numeric(value) } } })
}

pub fn fuzzy(field: &str, value: &str) -> Value {
	json!({ "fuzzy": { field: { "value": value, "fuzziness": "AUTO" } } })
}

fn numeric(value: &str) -> Value {
	let v = value.trim();
	if let Ok(n) = v.parse::<i64>() {
		return Value::from(n);
	}
	match v.parse::<f64>() {
		Ok(f) if f.is_finite() => Value::from(f),
		_ => Value::String(v.to_string()),
	}
}

pub fn filter_query(doc_type: &DocumentType, filter: &AttributeFilter) -> Result<Value> {
	let attribute = doc_type.attribute(&filter.name).ok_or_else(|| {
		Error::Operation(format!("'{}' is not an attribute of {}", filter.name, doc_type.name))
	})?;
	Ok(match attribute.kind {
		AttributeKind::Text => match_phrase(&filter.name, &filter.value),
		AttributeKind::Default => match_query(&filter.name, &filter.value),
		AttributeKind::Range => match filter.role {
			Some(role) if role != RangeRole::Eq => range(&filter.name, role, &filter.value),
			_ => match_query(&filter.name, &filter.value),
		},
	})
}

/// `{"size": limit, "query": {"bool": {"must": [...]}}}`
pub fn search_body(doc_type: &DocumentType, filters: &[AttributeFilter], limit: usize) -> Result<Value> {
	let must = filters.iter().map(|f| filter_query(doc_type, f)).collect::<Result<Vec<_>>>()?;
	Ok(json!({ "size": limit, "query": { "bool": { "must": must } } }))
}
