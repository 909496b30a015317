use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BulkItem, BulkItemError, BulkItemResult, BulkResponse, DocumentStore};
use crate::error::{PipelineError, Result};
use crate::writers::mapping::IndexMapping;

#[derive(Debug, Default)]
struct StoredIndex {
    mapping: Option<IndexMapping>,
    documents: Vec<Value>,
}

/// Store that keeps documents in memory, applying the index mapping to
/// reject mismatched documents one by one the way the real store does.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    indices: Mutex<HashMap<String, StoredIndex>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredIndex>> {
        self.indices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn documents(&self, index: &str) -> Vec<Value> {
        self.lock()
            .get(index)
            .map(|stored| stored.documents.clone())
            .unwrap_or_default()
    }

    pub fn mapping(&self, index: &str) -> Option<IndexMapping> {
        self.lock().get(index).and_then(|stored| stored.mapping.clone())
    }

    fn index_document(indices: &mut HashMap<String, StoredIndex>, index: &str, document: Value) -> BulkItem {
        // Bulk writes to a missing index create it without a mapping
        let stored = indices.entry(index.to_string()).or_default();

        let rejection = stored
            .mapping
            .as_ref()
            .and_then(|mapping| mapping.check_document(&document).err());

        let result = match rejection {
            Some(reason) => BulkItemResult {
                index: Some(index.to_string()),
                status: 400,
                error: Some(BulkItemError {
                    error_type: "mapper_parsing_exception".to_string(),
                    reason: Some(reason),
                }),
            },
            None => {
                stored.documents.push(document);
                BulkItemResult {
                    index: Some(index.to_string()),
                    status: 201,
                    error: None,
                }
            }
        };

        BulkItem { index: result }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.lock().contains_key(index))
    }

    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<()> {
        let mut indices = self.lock();
        if indices.contains_key(index) {
            return Err(PipelineError::BulkProtocol {
                endpoint: index.to_string(),
                status: 400,
                body: format!("resource_already_exists_exception: index [{}] already exists", index),
            });
        }

        indices.insert(
            index.to_string(),
            StoredIndex {
                mapping: Some(mapping.clone()),
                documents: Vec::new(),
            },
        );
        Ok(())
    }

    async fn bulk(&self, body: String) -> Result<BulkResponse> {
        let mut indices = self.lock();
        let mut items = Vec::new();
        let mut lines = body.lines().filter(|line| !line.trim().is_empty());

        while let Some(action_line) = lines.next() {
            let action: Value = serde_json::from_str(action_line)?;
            let index = action
                .get("index")
                .and_then(|meta| meta.get("_index"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    PipelineError::InvalidFormat(format!("Malformed bulk action: {}", action_line))
                })?
                .to_string();

            let source_line = lines.next().ok_or_else(|| {
                PipelineError::InvalidFormat("Bulk action without a document line".to_string())
            })?;
            let document: Value = serde_json::from_str(source_line)?;

            items.push(Self::index_document(&mut indices, &index, document));
        }

        Ok(BulkResponse {
            took: 0,
            errors: items.iter().any(|item| !item.index.is_success()),
            items,
        })
    }

    async fn count(&self, index: &str) -> Result<u64> {
        self.lock()
            .get(index)
            .map(|stored| stored.documents.len() as u64)
            .ok_or_else(|| PipelineError::BulkProtocol {
                endpoint: format!("{}/_count", index),
                status: 404,
                body: format!("index_not_found_exception: no such index [{}]", index),
            })
    }
}
