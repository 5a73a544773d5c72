//! Embedding gateway: batching, retry, and graceful per-item degradation
//! on top of a raw embedding backend.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use ragkit_core::error::{Error, Result};
use ragkit_core::traits::EmbeddingBackend;

use crate::retry;

/// Pause inserted between successive batch calls to stay under the
/// backend's request-rate ceiling. Skipped after the final batch.
const BATCH_PAUSE: Duration = Duration::from_millis(100);
const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_CAP: Duration = Duration::from_secs(10);

pub struct EmbeddingGateway {
    backend: Arc<dyn EmbeddingBackend>,
}

impl EmbeddingGateway {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    pub fn dim(&self) -> usize {
        self.backend.dim()
    }

    /// Embed a single text, retrying transient failures with backoff.
    /// Exhausting the attempt budget propagates the final error.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        retry::with_backoff(retry::DEFAULT_ATTEMPTS, RETRY_BASE, RETRY_CAP, || {
            self.backend.embed(text)
        })
        .await
    }

    /// Embed many texts. Output order and length always match the input;
    /// an empty input returns immediately without a remote call.
    ///
    /// A failing batch degrades to per-item calls; an item that still
    /// fails after its retries contributes a zero vector instead of
    /// failing the whole request.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = self.backend.max_batch().max(1);
        let batch_count = texts.len().div_ceil(batch_size);
        let mut vectors = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(batch_size).enumerate() {
            match self.backend.embed_batch(batch).await {
                Ok(batch_vectors) => {
                    vectors.extend(batch_vectors);
                    info!(
                        batch = batch_index + 1,
                        batches = batch_count,
                        size = batch.len(),
                        "embedded batch"
                    );
                }
                Err(err) => {
                    warn!(
                        batch = batch_index + 1,
                        error = %err,
                        "batch embedding failed, falling back to per-item calls"
                    );
                    for text in batch {
                        match self.embed(text).await {
                            Ok(vector) => vectors.push(vector),
                            Err(item_err) => {
                                warn!(error = %item_err, "item embedding failed, substituting zero vector");
                                vectors.push(vec![0.0; self.backend.dim()]);
                            }
                        }
                    }
                }
            }
            if batch_index + 1 < batch_count {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
        }

        Ok(vectors)
    }

    /// Embed a search query. An empty query is an input-validation
    /// failure, rejected before any network call.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query cannot be empty".into()));
        }
        self.embed(query).await
    }

    /// Probe the backend with a trivial embedding call.
    pub async fn validate_backend(&self) -> bool {
        match self.embed("test").await {
            Ok(vector) => !vector.is_empty(),
            Err(err) => {
                warn!(error = %err, "embedding backend validation failed");
                false
            }
        }
    }
}

/// Cosine similarity in `[-1, 1]`; defined as 0 when either vector has
/// zero norm, rather than failing on the division.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

/// An item paired with its similarity to a query vector.
#[derive(Debug, Clone)]
pub struct ScoredCandidate<T> {
    pub item: T,
    pub similarity: f32,
}

/// Score every candidate, drop those below `threshold`, and return the
/// `top_k` best, descending. The sort is stable, so equal scores keep
/// input order.
pub fn find_similar<T: Clone>(
    query: &[f32],
    candidates: &[(T, Vec<f32>)],
    top_k: usize,
    threshold: f32,
) -> Vec<ScoredCandidate<T>> {
    let mut scored: Vec<ScoredCandidate<T>> = candidates
        .iter()
        .map(|(item, embedding)| ScoredCandidate {
            item: item.clone(),
            similarity: cosine_similarity(query, embedding),
        })
        .filter(|candidate| candidate.similarity >= threshold)
        .collect();
    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        let a = vec![1.0, 0.0];
        let zero = vec![0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_minus_one() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn find_similar_filters_and_ranks() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            ("opposite", vec![-1.0, 0.0]),
            ("exact", vec![1.0, 0.0]),
            ("orthogonal", vec![0.0, 1.0]),
        ];
        let hits = find_similar(&query, &candidates, 10, 0.0);
        assert_eq!(hits.len(), 2, "negative scores filtered by threshold");
        assert_eq!(hits[0].item, "exact");
        assert_eq!(hits[1].item, "orthogonal");

        let top_one = find_similar(&query, &candidates, 1, -1.0);
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].item, "exact");
    }
}
