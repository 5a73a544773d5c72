//! OpenAI-style embeddings endpoint client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragkit_core::config::EmbeddingSettings;
use ragkit_core::error::{Error, Result};
use ragkit_core::traits::EmbeddingBackend;

pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    /// Missing credentials fail fast here, before any request is issued.
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(Error::InvalidConfig("embedding.api_key is required".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            dimension: settings.dimension,
            batch_size: settings.batch_size,
        })
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.endpoint);
        let body = EmbeddingsRequest { model: &self.model, input };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("embeddings request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Backend(format!("embeddings request rejected: {e}")))?;
        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("invalid embeddings response: {e}")))?;
        debug!(count = parsed.data.len(), model = %self.model, "embeddings response");
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbeddings {
    fn dim(&self) -> usize {
        self.dimension
    }

    fn max_batch(&self) -> usize {
        self.batch_size
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = [text.to_string()];
        let mut vectors = self.request(&input).await?;
        if vectors.is_empty() {
            return Err(Error::Backend("embeddings response was empty".into()));
        }
        Ok(vectors.swap_remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::Backend(format!(
                "embedder returned wrong count: got {} expected {}",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}
