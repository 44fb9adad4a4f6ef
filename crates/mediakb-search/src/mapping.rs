use serde_json::{json, Map, Value};

use mediakb_core::schema::{AttributeKind, DocumentType};

/// Index body for `PUT /<index>`: text attributes also get a `keyword`
/// sub-field, range attributes are stored as integers.
pub fn index_mapping(doc_type: &DocumentType) -> Value {
	let mut properties = Map::new();
	for attribute in &doc_type.attributes {
		let field = match attribute.kind {
			AttributeKind::Text => json!({
				"type": "text",
				"fields": { "keyword": { "type": "keyword", "ignore_above": 256 } }
			}),
			AttributeKind::Default => json!({ "type": "text" }),
			AttributeKind::Range => json!({ "type": "integer" }),
		};
		properties.insert(attribute.name.clone(), field);
	}
	json!({ "mappings": { "properties": properties } })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn movie_mapping() {
		let m = index_mapping(&DocumentType::movie("movie"));
		let props = &m["mappings"]["properties"];
		assert_eq!(props["publication_year"]["type"], "integer");
		assert_eq!(props["director"]["fields"]["keyword"]["type"], "keyword");
		assert_eq!(props["summary"], json!({"type": "text"}));
		assert_eq!(props.as_object().map(Map::len), Some(6));
	}
}
