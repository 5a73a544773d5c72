//! Embedding gateway and backends.
//!
//! The gateway layers batching, retry, and graceful per-item degradation
//! over a raw [`EmbeddingBackend`]. Two backends ship here: an
//! OpenAI-style remote client and a deterministic fake for tests and
//! offline runs.

use std::sync::Arc;

use tracing::info;

use ragkit_core::config::EmbeddingSettings;
use ragkit_core::error::Result;
use ragkit_core::traits::EmbeddingBackend;

pub mod fake;
pub mod gateway;
pub mod openai;
pub mod retry;

pub use fake::FakeEmbeddings;
pub use gateway::{cosine_similarity, find_similar, EmbeddingGateway, ScoredCandidate};
pub use openai::OpenAiEmbeddings;

/// Build the configured embedding backend. Respects
/// `APP_USE_FAKE_EMBEDDINGS=1` to switch to the deterministic fake for
/// fast offline runs and tests.
pub fn default_backend(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingBackend>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        info!(dim = settings.dimension, "using fake embeddings backend");
        return Ok(Arc::new(FakeEmbeddings::new(settings.dimension)));
    }
    Ok(Arc::new(OpenAiEmbeddings::new(settings)?))
}
