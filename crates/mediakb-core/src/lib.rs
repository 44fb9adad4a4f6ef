//! mediakb-core
//!
//! Shared pieces of the media knowledge-base assistant: configuration,
//! document-type schema, the `KnowledgeBase` trait with an in-memory
//! implementation, dataset transformation into bulk-load documents and the
//! assistant domain/script models.

pub mod config;
pub mod dataset;
pub mod dialogue;
pub mod error;
pub mod memory;
pub mod schema;
pub mod slots;
pub mod traits;
pub mod types;
