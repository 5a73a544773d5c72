//! Deterministic embedding backend for tests and offline runs.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use twox_hash::XxHash64;

use ragkit_core::error::Result;
use ragkit_core::traits::EmbeddingBackend;

/// Hashed bag-of-words vectors: identical text always embeds identically,
/// and shared tokens produce above-zero cosine similarity. Vectors are
/// unit-normalized.
pub struct FakeEmbeddings {
    dim: usize,
}

impl FakeEmbeddings {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl EmbeddingBackend for FakeEmbeddings {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_batch(&self) -> usize {
        64
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}
