//! mediakb-search
//!
//! Elasticsearch side of the knowledge base: the HTTP client, query and
//! mapping builders, the [`ElasticsearchKnowledgeBase`] used by the action
//! and the [`BulkLoader`] that fills the indices.
pub mod bulk;
pub mod client;
pub mod knowledge_base;
pub mod mapping;
pub mod query;

pub use bulk::{BulkLoader, BulkReport};
pub use client::EsClient;
pub use knowledge_base::ElasticsearchKnowledgeBase;
