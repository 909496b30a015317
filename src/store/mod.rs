//! Destination store abstraction.
//!
//! The pipeline talks to the search store at exactly two points: an
//! idempotent "ensure index exists" check and the bulk write. Both go through
//! [`DocumentStore`] so the loader can run against Elasticsearch or an
//! in-memory store for dry runs and tests.

pub mod elasticsearch;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::writers::mapping::IndexMapping;

pub use elasticsearch::ElasticsearchStore;
pub use memory::InMemoryStore;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<()>;

    /// Submits one NDJSON bulk body. Per-document rejections are reported in
    /// the response; only protocol-level failures are errors.
    async fn bulk(&self, body: String) -> Result<BulkResponse>;

    async fn count(&self, index: &str) -> Result<u64>;
}

/// Subset of the `_bulk` response the loader needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    pub errors: bool,
    pub items: Vec<BulkItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItem {
    #[serde(alias = "create")]
    pub index: BulkItemResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemResult {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BulkItemError>,
}

impl BulkItemResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl std::fmt::Display for BulkItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.error_type, reason),
            None => write!(f, "{}", self.error_type),
        }
    }
}
