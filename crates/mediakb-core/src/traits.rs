use async_trait::async_trait;

use crate::error::Result;
use crate::schema::DocumentType;
use crate::types::{AttributeFilter, KbObject};

/// Read access to the indexed books, movies and ratings.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    fn document_type(&self, object_type: &str) -> Option<&DocumentType>;

    fn attributes_of(&self, object_type: &str) -> Vec<String> {
        self.document_type(object_type).map(DocumentType::attribute_names).unwrap_or_default()
    }

    fn key_attribute(&self, _object_type: &str) -> &str {
        "id"
    }

    /// Objects of `object_type` matching every filter, in backend order.
    async fn get_objects(
        &self,
        object_type: &str,
        filters: &[AttributeFilter],
        limit: usize,
    ) -> Result<Vec<KbObject>>;

    /// The object with key `id`, or `None` when it does not exist.
    async fn get_object(&self, object_type: &str, id: &str) -> Result<Option<KbObject>>;
}
