//! Indexing pipeline: chunk identity, change detection, batch embedding,
//! and a single index write per run.
//!
//! Running the pipeline twice over unchanged content makes zero embedding
//! calls on the second run and leaves the index untouched. A failure in
//! the embed or store step aborts the call and propagates; progress
//! already written is not rolled back (at-least-once, not atomic).

use std::sync::Arc;

use tracing::info;

use ragkit_core::error::Result;
use ragkit_core::types::{Chunk, IndexEntry, IndexingStats};
use ragkit_embed::EmbeddingGateway;
use ragkit_index::VectorIndexService;

/// Deterministic chunk identity: the same source and position always map
/// to the same id, so re-indexing overwrites instead of duplicating.
pub fn chunk_id(source_id: &str, chunk_index: usize) -> String {
    format!("{source_id}_{chunk_index}")
}

/// Content fingerprint stored in entry metadata for change detection.
/// Identical text always hashes identically; nothing else is promised.
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub struct IndexingPipeline {
    gateway: Arc<EmbeddingGateway>,
    index: Arc<VectorIndexService>,
}

impl IndexingPipeline {
    pub fn new(gateway: Arc<EmbeddingGateway>, index: Arc<VectorIndexService>) -> Self {
        Self { gateway, index }
    }

    async fn ensure_ready(&self) -> Result<()> {
        if !self.index.is_initialized().await {
            self.index.initialize().await?;
        }
        Ok(())
    }

    /// Index `chunks` for `source_id`, skipping chunks whose stored
    /// fingerprint matches. `force_reindex` re-embeds everything.
    pub async fn index_chunks(
        &self,
        chunks: &[Chunk],
        source_id: &str,
        force_reindex: bool,
    ) -> Result<IndexingStats> {
        self.ensure_ready().await?;

        let mut stats = IndexingStats {
            total_chunks: chunks.len(),
            ..Default::default()
        };

        let mut texts_to_embed: Vec<String> = Vec::new();
        let mut selected: Vec<(&Chunk, String)> = Vec::new();

        for chunk in chunks {
            let id = chunk_id(source_id, chunk.chunk_index);
            if !force_reindex {
                if let Some(existing) = self.index.get_document(&id).await? {
                    let new_hash = content_hash(&chunk.text);
                    let stored = existing.metadata.get("content_hash").map(String::as_str);
                    if stored == Some(new_hash.as_str()) {
                        stats.skipped += 1;
                        continue;
                    }
                }
            }
            texts_to_embed.push(chunk.text.clone());
            selected.push((chunk, id));
        }

        if !texts_to_embed.is_empty() {
            info!(count = texts_to_embed.len(), source_id, "generating embeddings");
            let embeddings = self.gateway.embed_batch(&texts_to_embed).await?;

            let entries: Vec<IndexEntry> = selected
                .iter()
                .zip(embeddings)
                .map(|((chunk, id), embedding)| {
                    let mut metadata = chunk.metadata.clone();
                    metadata.insert("source_id".to_string(), source_id.to_string());
                    metadata.insert("content_hash".to_string(), content_hash(&chunk.text));
                    IndexEntry {
                        id: id.clone(),
                        embedding,
                        text: chunk.text.clone(),
                        metadata,
                    }
                })
                .collect();

            self.index.add_documents(entries).await?;
            stats.indexed = selected.len();
        }

        info!(
            source_id,
            indexed = stats.indexed,
            skipped = stats.skipped,
            failed = stats.failed,
            "indexing completed"
        );
        Ok(stats)
    }

    /// Delete every chunk previously indexed for `source_id`. Chunk ids
    /// are contiguous by construction, so the walk stops at the first
    /// absent id.
    pub async fn delete_source_chunks(&self, source_id: &str) -> Result<usize> {
        self.ensure_ready().await?;

        let mut ids = Vec::new();
        loop {
            let id = chunk_id(source_id, ids.len());
            if self.index.get_document(&id).await?.is_none() {
                break;
            }
            ids.push(id);
        }
        if !ids.is_empty() {
            self.index.delete_documents(&ids).await?;
        }
        info!(source_id, count = ids.len(), "deleted source chunks");
        Ok(ids.len())
    }

    /// Drop a source's chunks so the next `index_chunks` run starts from
    /// scratch. Returns how many entries were removed.
    pub async fn reindex_source(&self, source_id: &str) -> Result<usize> {
        self.delete_source_chunks(source_id).await
    }

    /// Overall index statistics for operational reporting.
    pub async fn indexing_stats(&self) -> Result<PipelineStats> {
        self.ensure_ready().await?;
        Ok(PipelineStats {
            total_documents: self.index.count_documents().await?,
            backend: self.index.backend_kind().to_string(),
            embedding_dimension: self.gateway.dim(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_documents: usize,
    pub backend: String,
    pub embedding_dimension: usize,
}
