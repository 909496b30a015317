use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::store::DocumentStore;
use crate::utils::constants::DEFAULT_BULK_CHUNK_SIZE;
use crate::utils::progress::ProgressReporter;
use crate::writers::mapping::IndexMapping;

/// Per-run tally of a bulk load. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkLoadOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkLoadOutcome {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn summary(&self) -> String {
        format!(
            "Indexed successfully: {}, failures: {}",
            self.succeeded, self.failed
        )
    }
}

/// Writes documents to a [`DocumentStore`] through its bulk API.
///
/// The load is append-only: documents carry no id, so loading the same
/// batch twice stores it twice. Rejected documents are counted, not raised;
/// only a failure of the bulk request itself aborts the load.
pub struct BulkLoader<'a> {
    store: &'a dyn DocumentStore,
    chunk_size: usize,
    max_reported_failures: usize,
}

impl<'a> BulkLoader<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            chunk_size: DEFAULT_BULK_CHUNK_SIZE,
            max_reported_failures: 10,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_reported_failures(mut self, max: usize) -> Self {
        self.max_reported_failures = max;
        self
    }

    /// Creates the index with `mapping` unless it already exists.
    /// Returns whether the index was created.
    pub async fn ensure_index(&self, index: &str, mapping: &IndexMapping) -> Result<bool> {
        if self.store.index_exists(index).await? {
            debug!(index, "Index already exists, keeping its mapping");
            return Ok(false);
        }

        self.store.create_index(index, mapping).await?;
        info!(index, fields = mapping.len(), "Created index");
        Ok(true)
    }

    /// Ensures the index, then bulk-writes every document.
    pub async fn load<T: Serialize + Sync>(
        &self,
        index: &str,
        mapping: &IndexMapping,
        documents: &[T],
        progress: Option<&ProgressReporter>,
    ) -> Result<BulkLoadOutcome> {
        self.ensure_index(index, mapping).await?;

        let mut outcome = BulkLoadOutcome::default();
        let mut reported = 0;

        for chunk in documents.chunks(self.chunk_size) {
            let body = encode_bulk_body(index, chunk)?;
            let response = self.store.bulk(body).await?;

            if response.items.len() != chunk.len() {
                return Err(PipelineError::BulkProtocol {
                    endpoint: "_bulk".to_string(),
                    status: 200,
                    body: format!(
                        "expected {} items in bulk response, got {}",
                        chunk.len(),
                        response.items.len()
                    ),
                });
            }

            for item in &response.items {
                if item.index.is_success() {
                    outcome.succeeded += 1;
                    continue;
                }

                outcome.failed += 1;
                if reported < self.max_reported_failures {
                    reported += 1;
                    match &item.index.error {
                        Some(error) => warn!(index, status = item.index.status, %error, "Document rejected"),
                        None => warn!(index, status = item.index.status, "Document rejected"),
                    }
                }
            }

            if let Some(p) = progress {
                p.increment(chunk.len() as u64);
            }
        }

        info!(
            index,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Bulk load finished"
        );

        Ok(outcome)
    }
}

/// Renders documents as an NDJSON bulk body, one `index` action per document.
pub fn encode_bulk_body<T: Serialize>(index: &str, documents: &[T]) -> Result<String> {
    let action = serde_json::to_string(&json!({ "index": { "_index": index } }))?;
    let mut body = String::new();

    for document in documents {
        let source = serde_json::to_string(document)?;
        body.push_str(&action);
        body.push('\n');
        body.push_str(&source);
        body.push('\n');
    }

    Ok(body)
}
