//! Document types known to the knowledge base.
//!
//! A document type names the index holding its documents, the attributes
//! the action may filter on or ask about, and how a document is rendered
//! in an utterance.

use serde_json::{Map, Value};

use crate::types::{display_value, KbObject};

/// How an attribute is matched when used as a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    /// Full-text match of any term.
    Default,
    /// Exact phrase match.
    Text,
    /// Numeric value compared through the entity role.
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn new(name: &str, kind: AttributeKind) -> Self {
        Self { name: name.to_string(), kind }
    }

    pub fn field<'a>(&self, source: &'a Map<String, Value>) -> Option<&'a Value> {
        source.get(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct DocumentType {
    pub name: String,
    pub index: String,
    pub attributes: Vec<Attribute>,
    /// `{field}` placeholders are replaced by the document's values.
    pub representation: String,
}

impl DocumentType {
    pub fn new(name: &str, index: &str, attributes: Vec<Attribute>, representation: &str) -> Self {
        Self {
            name: name.to_string(),
            index: index.to_string(),
            attributes,
            representation: representation.to_string(),
        }
    }

    pub fn book(index: &str) -> Self {
        Self::new(
            "book",
            index,
            vec![
                Attribute::new("title", AttributeKind::Text),
                Attribute::new("author", AttributeKind::Text),
                Attribute::new("publication_year", AttributeKind::Range),
                Attribute::new("genres", AttributeKind::Text),
                Attribute::new("summary", AttributeKind::Default),
            ],
            "{title} from {publication_year}",
        )
    }

    pub fn movie(index: &str) -> Self {
        Self::new(
            "movie",
            index,
            vec![
                Attribute::new("title", AttributeKind::Text),
                Attribute::new("publication_year", AttributeKind::Range),
                Attribute::new("genres", AttributeKind::Text),
                Attribute::new("summary", AttributeKind::Default),
                Attribute::new("actors", AttributeKind::Text),
                Attribute::new("director", AttributeKind::Text),
            ],
            "{title} from {publication_year}",
        )
    }

    pub fn rating(index: &str) -> Self {
        Self::new(
            "rating",
            index,
            vec![
                Attribute::new("mean_rating", AttributeKind::Default),
                Attribute::new("total_votes", AttributeKind::Default),
            ],
            "{mean_rating} out of 10 ({total_votes} votes)",
        )
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    /// Renders the representation template against a document source.
    /// Missing or null fields render as `?`.
    pub fn represent(&self, source: &Map<String, Value>) -> String {
        let mut out = String::with_capacity(self.representation.len());
        let mut rest = self.representation.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let field = &after[..close];
                    let value = source.get(field).and_then(display_value);
                    out.push_str(value.as_deref().unwrap_or("?"));
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Projects an indexed document onto this type's attributes.
    pub fn to_kb_object(&self, id: &str, source: &Map<String, Value>) -> KbObject {
        let attributes = self
            .attributes
            .iter()
            .map(|a| (a.name.clone(), a.field(source).cloned().unwrap_or(Value::Null)))
            .collect();
        KbObject { id: id.to_string(), name: self.represent(source), attributes }
    }
}

/// The fixed set of document types served by the assistant.
#[derive(Debug, Clone)]
pub struct Catalog {
    types: Vec<DocumentType>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            DocumentType::book("book"),
            DocumentType::movie("movie"),
            DocumentType::rating("rating"),
        ])
    }
}

impl Catalog {
    pub fn new(types: Vec<DocumentType>) -> Self {
        Self { types }
    }

    pub fn get(&self, object_type: &str) -> Option<&DocumentType> {
        self.types.iter().find(|t| t.name == object_type)
    }

    pub fn by_index(&self, index: &str) -> Option<&DocumentType> {
        self.types.iter().find(|t| t.index == index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentType> {
        self.types.iter()
    }

    /// Every attribute name across all types, without duplicates.
    pub fn all_attributes(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for t in &self.types {
            for a in &t.attributes {
                if !names.contains(&a.name) {
                    names.push(a.name.clone());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn book_representation_uses_title_and_year() {
        let doc = source(json!({"title": "The Great Gatsby", "publication_year": 1925}));
        assert_eq!(DocumentType::book("book").represent(&doc), "The Great Gatsby from 1925");
    }

    #[test]
    fn missing_fields_render_as_question_mark() {
        let doc = source(json!({"mean_rating": 7.8}));
        assert_eq!(DocumentType::rating("rating").represent(&doc), "7.8 out of 10 (? votes)");
    }

    #[test]
    fn kb_object_carries_every_attribute() {
        let doc = source(json!({"title": "Heat", "director": "Michael Mann", "budget": 60}));
        let obj = DocumentType::movie("movie").to_kb_object("tt0113277", &doc);
        assert_eq!(obj.id, "tt0113277");
        assert_eq!(obj.attributes.len(), 6);
        assert_eq!(obj.get("director"), Some(&json!("Michael Mann")));
        assert_eq!(obj.get("summary"), Some(&Value::Null));
        assert!(!obj.attributes.contains_key("budget"));
    }

    #[test]
    fn catalog_lists_shared_attributes_once() {
        let names = Catalog::default().all_attributes();
        assert_eq!(names.iter().filter(|n| n.as_str() == "title").count(), 1);
        assert!(names.contains(&"mean_rating".to_string()));
    }
}
