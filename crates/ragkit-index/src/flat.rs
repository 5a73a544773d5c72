//! In-process vector index persisted as two paired JSON artifacts.
//!
//! `index.json` holds ordered `(id, unit-normalized vector)` rows;
//! `documents.json` holds the parallel `id -> {text, metadata}` mapping.
//! Both are written together on every mutation and read together on
//! `initialize`, so neither can drift from the other. Vectors are
//! retained in the rows, which makes delete a lossless rebuild of the
//! remaining entries.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use ragkit_core::error::Result;
use ragkit_core::traits::VectorStore;
use ragkit_core::types::{IndexEntry, Meta, SearchResult, StoredDocument};

use crate::repair_dimension;

const INDEX_FILE: &str = "index.json";
const DOCUMENTS_FILE: &str = "documents.json";

/// One row of the flat index: an id and its unit-normalized vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexRow {
    id: String,
    vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentRecord {
    text: String,
    metadata: Meta,
}

#[derive(Default)]
struct FlatState {
    rows: Vec<IndexRow>,
    documents: HashMap<String, DocumentRecord>,
}

pub struct FlatIndex {
    dimension: usize,
    index_path: PathBuf,
    documents_path: PathBuf,
    // One write lock per instance serializes mutating calls; readers
    // share. Persistence is read-then-rewrite-whole-file.
    state: RwLock<FlatState>,
}

impl FlatIndex {
    pub fn new(data_dir: &Path, dimension: usize) -> Self {
        Self {
            dimension,
            index_path: data_dir.join(INDEX_FILE),
            documents_path: data_dir.join(DOCUMENTS_FILE),
            state: RwLock::new(FlatState::default()),
        }
    }

    fn load_state(&self) -> Result<FlatState> {
        if !self.index_path.exists() || !self.documents_path.exists() {
            info!(path = %self.index_path.display(), "no existing index, starting empty");
            return Ok(FlatState::default());
        }
        let rows: Vec<IndexRow> = serde_json::from_str(&fs::read_to_string(&self.index_path)?)?;
        let documents: HashMap<String, DocumentRecord> =
            serde_json::from_str(&fs::read_to_string(&self.documents_path)?)?;
        info!(documents = documents.len(), "loaded existing flat index");
        Ok(FlatState { rows, documents })
    }

    /// Write both artifacts together. Callers hold the write lock.
    fn save_state(&self, state: &FlatState) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.index_path, serde_json::to_string(&state.rows)?)?;
        fs::write(
            &self.documents_path,
            serde_json::to_string_pretty(&state.documents)?,
        )?;
        Ok(())
    }

    fn prepare_vector(&self, vector: Vec<f32>) -> Vec<f32> {
        let mut vector = repair_dimension(vector, self.dimension);
        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl VectorStore for FlatIndex {
    async fn initialize(&self) -> Result<()> {
        let loaded = match self.load_state() {
            Ok(state) => state,
            Err(err) => {
                // Corrupt persisted state must not leave the index
                // unusable; fall back to empty.
                warn!(error = %err, "failed to load flat index, starting empty");
                FlatState::default()
            }
        };
        *self.state.write().await = loaded;
        Ok(())
    }

    async fn add_documents(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut state = self.state.write().await;
        let count = entries.len();
        for entry in entries {
            let vector = self.prepare_vector(entry.embedding);
            state.rows.push(IndexRow {
                id: entry.id.clone(),
                vector,
            });
            state.documents.insert(
                entry.id,
                DocumentRecord {
                    text: entry.text,
                    metadata: entry.metadata,
                },
            );
        }
        self.save_state(&state)?;
        info!(count, total = state.documents.len(), "added documents to flat index");
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let state = self.state.read().await;
        if state.rows.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.prepare_vector(query.to_vec());

        // Rows hold unit vectors, so the dot product realizes cosine
        // similarity.
        let mut scored: Vec<(f32, &IndexRow)> = state
            .rows
            .iter()
            .map(|row| (dot(&query, &row.vector), row))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut results = Vec::new();
        for (score, row) in scored.into_iter().take(top_k) {
            if let Some(record) = state.documents.get(&row.id) {
                results.push(SearchResult {
                    id: row.id.clone(),
                    text: record.text.clone(),
                    metadata: record.metadata.clone(),
                    score,
                });
            }
        }
        Ok(results)
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let removed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut state = self.state.write().await;
        state.documents.retain(|id, _| !removed.contains(id.as_str()));
        // Rebuild the row set from the retained vectors.
        state.rows.retain(|row| !removed.contains(row.id.as_str()));
        self.save_state(&state)?;
        info!(count = ids.len(), "deleted documents from flat index");
        Ok(())
    }

    async fn update_document(&self, id: &str, entry: IndexEntry) -> Result<()> {
        let vector = self.prepare_vector(entry.embedding);
        let mut state = self.state.write().await;
        state.rows.retain(|row| row.id != id);
        state.rows.push(IndexRow {
            id: id.to_string(),
            vector,
        });
        state.documents.insert(
            id.to_string(),
            DocumentRecord {
                text: entry.text,
                metadata: entry.metadata,
            },
        );
        self.save_state(&state)?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<StoredDocument>> {
        let state = self.state.read().await;
        Ok(state.documents.get(id).map(|record| StoredDocument {
            id: id.to_string(),
            text: record.text.clone(),
            metadata: record.metadata.clone(),
        }))
    }

    async fn count_documents(&self) -> Result<usize> {
        Ok(self.state.read().await.documents.len())
    }

    async fn close(&self) -> Result<()> {
        let state = self.state.read().await;
        self.save_state(&state)?;
        info!("flat index closed and saved");
        Ok(())
    }
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
