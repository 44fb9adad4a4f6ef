use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use mediakb_core::error::{Error, Result};
use mediakb_core::schema::{Catalog, DocumentType};
use mediakb_core::traits::KnowledgeBase;
use mediakb_core::types::{AttributeFilter, KbObject};

use crate::client::EsClient;
use crate::query::search_body;

/// Knowledge base backed by one Elasticsearch index per document type.
pub struct ElasticsearchKnowledgeBase {
	client: EsClient,
	catalog: Catalog,
}

impl ElasticsearchKnowledgeBase {
	pub fn new(client: EsClient, catalog: Catalog) -> Self {
		Self { client, catalog }
	}

	pub fn client(&self) -> &EsClient { &self.client }

	fn require(&self, object_type: &str) -> Result<&DocumentType> {
		self.catalog.get(object_type).ok_or_else(|| Error::UnknownObjectType(object_type.to_string()))
	}
}

fn hit_to_object(doc_type: &DocumentType, hit: &Value) -> Option<KbObject> {
	let id = match hit.get("_id")? {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	};
	let empty = Map::new();
	let source = hit.get("_source").and_then(Value::as_object).unwrap_or(&empty);
	Some(doc_type.to_kb_object(&id, source))
}

#[async_trait]
impl KnowledgeBase for ElasticsearchKnowledgeBase {
	fn document_type(&self, object_type: &str) -> Option<&DocumentType> {
		self.catalog.get(object_type)
	}

	#[instrument(skip(self, filters), fields(filters = filters.len()))]
	async fn get_objects(&self, object_type: &str, filters: &[AttributeFilter], limit: usize) -> Result<Vec<KbObject>> {
		let doc_type = self.require(object_type)?;
		let body = search_body(doc_type, filters, limit)?;
		let resp = self.client.search(&doc_type.index, &body).await?;
		let hits = resp
			.pointer("/hits/hits")
			.and_then(Value::as_array)
			.ok_or_else(|| Error::Backend { status: 200, body: "search response without hits.hits".into() })?;
		let objects: Vec<KbObject> = hits.iter().filter_map(|h| hit_to_object(doc_type, h)).collect();
		debug!(count = objects.len(), "search hits");
		Ok(objects)
	}

	#[instrument(skip(self))]
	async fn get_object(&self, object_type: &str, id: &str) -> Result<Option<KbObject>> {
		let doc_type = self.require(object_type)?;
		Ok(self.client.get_doc(&doc_type.index, id).await?.and_then(|doc| hit_to_object(doc_type, &doc)))
	}
}
