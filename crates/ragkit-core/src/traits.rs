//! Capability traits implemented by the remote backends and index variants.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{IndexEntry, SearchResult, StoredDocument};

/// Raw remote embedding backend: text in, fixed-length float vector out.
/// No retry or batching policy lives here; the gateway owns that.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Output dimensionality of the model.
    fn dim(&self) -> usize;
    /// Largest batch the backend accepts in one call.
    fn max_batch(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    /// Output order and length must match the input.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Remote answer generation backend: prompt in, text out. Failures are not
/// retried by the core and propagate immediately.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn model(&self) -> &str;
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String>;
}

/// Capability set implemented by interchangeable vector index backends.
///
/// `initialize` must be called once before any data operation. Every
/// stored vector has exactly the backend's configured dimension; inputs
/// that do not are repaired (zero-padded or truncated), never rejected.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Establish or load persisted state. Corrupt persisted state falls
    /// back to an empty index rather than leaving the index unusable.
    async fn initialize(&self) -> Result<()>;

    /// Insert entries. An id already present is added as a new entry for
    /// backends that cannot update in place; use `update_document` for
    /// true update semantics.
    async fn add_documents(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Up to `top_k` nearest entries by the backend's metric, descending
    /// by score. An empty index yields an empty result, not a failure.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    async fn delete_documents(&self, ids: &[String]) -> Result<()>;

    /// Overwrite stored text/metadata for `id`, then reinsert as if new.
    async fn update_document(&self, id: &str, entry: IndexEntry) -> Result<()>;

    async fn get_document(&self, id: &str) -> Result<Option<StoredDocument>>;

    async fn count_documents(&self) -> Result<usize>;

    /// Flush any in-memory state to durable storage.
    async fn close(&self) -> Result<()>;
}
