//! Remote managed-service vector index backend.
//!
//! Speaks a Pinecone-style REST surface: batched upserts, top-k query
//! with metadata, point fetch, deletion by id, and an index-stats call
//! for counting. The stored text preview is capped to respect the
//! service's metadata size limit.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use ragkit_core::config::IndexSettings;
use ragkit_core::error::{Error, Result};
use ragkit_core::traits::VectorStore;
use ragkit_core::types::{IndexEntry, Meta, SearchResult, StoredDocument};

use crate::repair_dimension;

/// Service-recommended upsert batch size.
const UPSERT_BATCH: usize = 100;
/// Metadata size limit on the managed service side.
const METADATA_TEXT_CAP: usize = 1000;

pub struct RemoteIndex {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    namespace: String,
    dimension: usize,
}

#[derive(Serialize)]
struct RemoteVector {
    id: String,
    values: Vec<f32>,
    metadata: Map<String, Value>,
}

#[derive(Serialize)]
struct UpsertRequest {
    vectors: Vec<RemoteVector>,
    namespace: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
    namespace: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Serialize)]
struct FetchRequest {
    ids: Vec<String>,
    namespace: String,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: Map<String, Value>,
}

#[derive(Serialize)]
struct DeleteRequest {
    ids: Vec<String>,
    namespace: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    total_vector_count: usize,
}

impl RemoteIndex {
    /// Missing credentials are a configuration failure, surfaced before
    /// any request is issued.
    pub fn new(settings: &IndexSettings, dimension: usize) -> Result<Self> {
        if settings.remote_endpoint.is_empty() {
            return Err(Error::InvalidConfig("index.remote_endpoint is required".into()));
        }
        if settings.remote_api_key.is_empty() {
            return Err(Error::InvalidConfig("index.remote_api_key is required".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: settings.remote_endpoint.trim_end_matches('/').to_string(),
            api_key: settings.remote_api_key.clone(),
            namespace: settings.namespace.clone(),
            dimension,
        })
    }

    async fn post<B: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("remote index request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Backend(format!("remote index request rejected: {e}")))?;
        response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("invalid remote index response: {e}")))
    }

    fn to_remote_vector(&self, entry: IndexEntry) -> RemoteVector {
        let values = repair_dimension(entry.embedding, self.dimension);
        let mut metadata = Map::new();
        for (key, value) in entry.metadata {
            metadata.insert(key, Value::String(value));
        }
        let preview: String = entry.text.chars().take(METADATA_TEXT_CAP).collect();
        metadata.insert("text".to_string(), Value::String(preview));
        metadata.insert(
            "created_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        RemoteVector {
            id: entry.id,
            values,
            metadata,
        }
    }
}

fn split_metadata(mut raw: Map<String, Value>) -> (String, Meta) {
    let text = match raw.remove("text") {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };
    let metadata = raw
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect();
    (text, metadata)
}

#[async_trait]
impl VectorStore for RemoteIndex {
    async fn initialize(&self) -> Result<()> {
        // Reachability probe; the managed service owns index creation.
        let stats: StatsResponse = self.post("/describe_index_stats", &Value::Null).await?;
        info!(
            namespace = %self.namespace,
            vectors = stats.total_vector_count,
            "remote index initialized"
        );
        Ok(())
    }

    async fn add_documents(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let count = entries.len();
        let mut vectors: Vec<RemoteVector> = entries
            .into_iter()
            .map(|entry| self.to_remote_vector(entry))
            .collect();
        while !vectors.is_empty() {
            let take = vectors.len().min(UPSERT_BATCH);
            let request = UpsertRequest {
                vectors: vectors.drain(..take).collect(),
                namespace: self.namespace.clone(),
            };
            let _: Value = self.post("/vectors/upsert", &request).await?;
        }
        info!(count, "documents upserted to remote index");
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let request = QueryRequest {
            vector: repair_dimension(query.to_vec(), self.dimension),
            top_k,
            include_metadata: true,
            namespace: self.namespace.clone(),
        };
        let response: QueryResponse = self.post("/query", &request).await?;
        debug!(matches = response.matches.len(), "remote index query");
        Ok(response
            .matches
            .into_iter()
            .map(|m| {
                let (text, metadata) = split_metadata(m.metadata);
                SearchResult {
                    id: m.id,
                    text,
                    metadata,
                    score: m.score,
                }
            })
            .collect())
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let request = DeleteRequest {
            ids: ids.to_vec(),
            namespace: self.namespace.clone(),
        };
        let _: Value = self.post("/vectors/delete", &request).await?;
        info!(count = ids.len(), "documents deleted from remote index");
        Ok(())
    }

    async fn update_document(&self, id: &str, entry: IndexEntry) -> Result<()> {
        // The service has no in-place update; upsert under the same id.
        let entry = IndexEntry {
            id: id.to_string(),
            ..entry
        };
        self.add_documents(vec![entry]).await
    }

    async fn get_document(&self, id: &str) -> Result<Option<StoredDocument>> {
        let request = FetchRequest {
            ids: vec![id.to_string()],
            namespace: self.namespace.clone(),
        };
        let response: FetchResponse = self.post("/vectors/fetch", &request).await?;
        let Some(vector) = response.vectors.get(id) else {
            return Ok(None);
        };
        let raw = vector
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let (text, metadata) = split_metadata(raw);
        Ok(Some(StoredDocument {
            id: id.to_string(),
            text,
            metadata,
        }))
    }

    async fn count_documents(&self) -> Result<usize> {
        let stats: StatsResponse = self.post("/describe_index_stats", &Value::Null).await?;
        Ok(stats.total_vector_count)
    }

    async fn close(&self) -> Result<()> {
        // Nothing to flush; the service persists on its side.
        info!("remote index connection closed");
        Ok(())
    }
}
