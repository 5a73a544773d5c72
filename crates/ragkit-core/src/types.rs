//! Domain types shared by the chunking, embedding, and index crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type EntryId = String;
pub type Meta = HashMap<String, String>;

/// A contiguous span of normalized source text, ready for embedding.
///
/// - `source_id`: stable identity of the originating document
/// - `chunk_index`/`total_chunks`: position within the parent document at
///   chunking time
/// - `metadata`: free-form string map (page title, timestamps, url, ...)
///
/// Immutable once created within a single indexing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub metadata: Meta,
}

/// The unit stored in a vector index.
///
/// `id` is derived deterministically from source id and chunk index, so
/// re-indexing the same position overwrites rather than duplicates. The
/// metadata carries `source_id` and `content_hash` for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: EntryId,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: Meta,
}

/// A stored entry as returned by point lookup, without its vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: EntryId,
    pub text: String,
    pub metadata: Meta,
}

/// A single search hit. `score` is backend-defined but higher is always
/// more similar. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: EntryId,
    pub text: String,
    pub metadata: Meta,
    pub score: f32,
}

/// Counters for one indexing invocation, discarded after being returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingStats {
    pub total_chunks: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// A ranked source citation returned with an answer. `text` is truncated
/// to a bounded preview; full text only reaches the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_id: String,
    pub title: String,
    pub text: String,
    pub score: f32,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub url: String,
}

/// The result of one retrieval-augmented query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub model_used: String,
    pub query: String,
}
