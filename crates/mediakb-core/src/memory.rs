//! Knowledge base held in memory, filled from bulk-load files.
//!
//! Serves the same documents the loader would send to Elasticsearch, which
//! makes it usable for local runs without a cluster. Text filters match a
//! case-insensitive substring; range filters compare numerically.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::dataset::{list_ndjson_files, read_ndjson, BulkDocument};
use crate::error::{Error, Result};
use crate::schema::{AttributeKind, Catalog, DocumentType};
use crate::traits::KnowledgeBase;
use crate::types::{display_value, AttributeFilter, KbObject, RangeRole};

pub struct InMemoryKnowledgeBase {
    catalog: Catalog,
    documents: HashMap<String, Vec<BulkDocument>>,
}

impl InMemoryKnowledgeBase {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, documents: HashMap::new() }
    }

    /// Loads every `<index>.ndjson` under `dir` whose stem names an index
    /// of the catalog. Other files are ignored.
    pub fn from_dir(catalog: Catalog, dir: &Path) -> Result<Self> {
        let mut kb = Self::new(catalog);
        for (index, path) in list_ndjson_files(dir) {
            let Some(object_type) = kb.catalog.by_index(&index).map(|t| t.name.clone()) else {
                debug!(file = %path.display(), "no document type for file, skipping");
                continue;
            };
            let docs = read_ndjson(&path)?;
            info!(object_type = %object_type, count = docs.len(), "loaded documents");
            kb.insert(&object_type, docs)?;
        }
        Ok(kb)
    }

    pub fn insert(&mut self, object_type: &str, docs: Vec<BulkDocument>) -> Result<()> {
        if self.catalog.get(object_type).is_none() {
            return Err(Error::UnknownObjectType(object_type.to_string()));
        }
        self.documents.entry(object_type.to_string()).or_default().extend(docs);
        Ok(())
    }

    pub fn count(&self, object_type: &str) -> usize {
        self.documents.get(object_type).map_or(0, Vec::len)
    }

    fn matches(doc_type: &DocumentType, doc: &BulkDocument, filter: &AttributeFilter) -> bool {
        let Some(attribute) = doc_type.attribute(&filter.name) else {
            return false;
        };
        let Some(field) = doc.source.get(&filter.name) else {
            return false;
        };
        match attribute.kind {
            AttributeKind::Range => match filter.role {
                Some(role) if role != RangeRole::Eq => compare(field, &filter.value, role),
                _ => text_contains(field, &filter.value),
            },
            AttributeKind::Default | AttributeKind::Text => text_contains(field, &filter.value),
        }
    }
}

fn text_contains(field: &Value, needle: &str) -> bool {
    display_value(field)
        .map(|hay| hay.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

fn compare(field: &Value, bound: &str, role: RangeRole) -> bool {
    let Some(value) = field.as_f64() else { return false };
    let Ok(bound) = bound.trim().parse::<f64>() else { return false };
    match role {
        RangeRole::Gt => value > bound,
        RangeRole::Gte => value >= bound,
        RangeRole::Lt => value < bound,
        RangeRole::Lte => value <= bound,
        RangeRole::Eq => (value - bound).abs() < f64::EPSILON,
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    fn document_type(&self, object_type: &str) -> Option<&DocumentType> {
        self.catalog.get(object_type)
    }

    async fn get_objects(
        &self,
        object_type: &str,
        filters: &[AttributeFilter],
        limit: usize,
    ) -> Result<Vec<KbObject>> {
        let doc_type = self
            .catalog
            .get(object_type)
            .ok_or_else(|| Error::UnknownObjectType(object_type.to_string()))?;
        let docs = self.documents.get(object_type).map(Vec::as_slice).unwrap_or_default();
        Ok(docs
            .iter()
            .filter(|d| filters.iter().all(|f| Self::matches(doc_type, d, f)))
            .take(limit)
            .map(|d| doc_type.to_kb_object(&d.id, &d.source))
            .collect())
    }

    async fn get_object(&self, object_type: &str, id: &str) -> Result<Option<KbObject>> {
        let doc_type = self
            .catalog
            .get(object_type)
            .ok_or_else(|| Error::UnknownObjectType(object_type.to_string()))?;
        Ok(self
            .documents
            .get(object_type)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .map(|d| doc_type.to_kb_object(&d.id, &d.source)))
    }
}
