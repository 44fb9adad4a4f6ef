use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{info, warn};

use mediakb_core::dataset::{to_ndjson, BulkDocument};
use mediakb_core::error::{Error, Result};
use mediakb_core::schema::DocumentType;

use crate::client::EsClient;
use crate::mapping::index_mapping;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
	pub index: String,
	pub sent: usize,
	pub failed: usize,
	pub batches: usize,
}

pub struct BulkLoader {
	client: EsClient,
	batch_size: usize,
	progress: bool,
}

impl BulkLoader {
	pub fn new(client: EsClient, batch_size: usize) -> Result<Self> {
		if batch_size == 0 {
			return Err(Error::InvalidConfig("batch size must be positive".into()));
		}
		Ok(Self { client, batch_size, progress: false })
	}

	/// Draw a progress bar on stderr while loading.
	pub fn with_progress(mut self, progress: bool) -> Self { self.progress = progress; self }

	/// Creates the index with its mapping when missing. With `recreate`
	/// an existing index is dropped first.
	pub async fn prepare_index(&self, doc_type: &DocumentType, recreate: bool) -> Result<()> {
		if recreate && self.client.delete_index(&doc_type.index).await? {
			info!(index = %doc_type.index, "deleted index");
		}
		if !self.client.index_exists(&doc_type.index).await? {
			self.client.create_index(&doc_type.index, &index_mapping(doc_type)).await?;
			info!(index = %doc_type.index, "created index");
		}
		Ok(())
	}

	pub async fn load(&self, index: &str, documents: &[BulkDocument]) -> Result<BulkReport> {
		let mut report = BulkReport { index: index.to_string(), ..Default::default() };
		let pb = if self.progress { ProgressBar::new(documents.len() as u64) } else { ProgressBar::hidden() };
		if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs {msg}") {
			pb.set_style(style.progress_chars("#>-"));
		}
		pb.set_message(index.to_string());
		for batch in documents.chunks(self.batch_size) {
			let resp = self.client.bulk(index, to_ndjson(batch)?).await?;
			let failed = count_failures(&resp);
			if failed > 0 {
				warn!(index, failed, "bulk batch had failing items");
			}
			report.sent += batch.len();
			report.failed += failed;
			report.batches += 1;
			pb.inc(batch.len() as u64);
		}
		pb.finish_and_clear();
		info!(index, sent = report.sent, failed = report.failed, batches = report.batches, "bulk load finished");
		Ok(report)
	}
}

/// Items of a `_bulk` response whose action carries an `error`.
pub fn count_failures(resp: &Value) -> usize {
	if resp.get("errors").and_then(Value::as_bool) != Some(true) {
		return 0;
	}
	resp.get("items")
		.and_then(Value::as_array)
		.map(|items| {
			items
				.iter()
				.filter(|item| item.as_object().is_some_and(|actions| actions.values().any(|a| a.get("error").is_some())))
				.count()
		})
		.unwrap_or(0)
}
