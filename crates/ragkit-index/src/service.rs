//! Backend selection and the initialized-before-use contract.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use ragkit_core::config::{expand_path, IndexSettings};
use ragkit_core::error::{Error, Result};
use ragkit_core::traits::VectorStore;
use ragkit_core::types::{IndexEntry, SearchResult, StoredDocument};

use crate::flat::FlatIndex;
use crate::remote::RemoteIndex;

/// Owns the configured [`VectorStore`] backend and enforces the
/// `Uninitialized -> Ready` state machine: any data operation before
/// `initialize` fails fast with [`Error::NotInitialized`] and is never
/// retried.
pub struct VectorIndexService {
    settings: IndexSettings,
    dimension: usize,
    store: RwLock<Option<Arc<dyn VectorStore>>>,
}

impl VectorIndexService {
    pub fn new(settings: IndexSettings, dimension: usize) -> Self {
        Self {
            settings,
            dimension,
            store: RwLock::new(None),
        }
    }

    /// Build the backend named by `index.backend` and bring it to
    /// `Ready`. An unsupported backend name is a configuration failure.
    pub async fn initialize(&self) -> Result<()> {
        let store: Arc<dyn VectorStore> = match self.settings.backend.as_str() {
            "flat" => Arc::new(FlatIndex::new(
                &expand_path(&self.settings.data_dir),
                self.dimension,
            )),
            "remote" => Arc::new(RemoteIndex::new(&self.settings, self.dimension)?),
            other => {
                return Err(Error::InvalidConfig(format!(
                    "unsupported vector index backend: {other}"
                )))
            }
        };
        store.initialize().await?;
        info!(backend = %self.settings.backend, "vector index initialized");
        *self.store.write().await = Some(store);
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.store.read().await.is_some()
    }

    pub fn backend_kind(&self) -> &str {
        &self.settings.backend
    }

    async fn store(&self) -> Result<Arc<dyn VectorStore>> {
        self.store.read().await.clone().ok_or(Error::NotInitialized)
    }

    pub async fn add_documents(&self, entries: Vec<IndexEntry>) -> Result<()> {
        self.store().await?.add_documents(entries).await
    }

    pub async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        self.store().await?.search(query, top_k).await
    }

    pub async fn delete_documents(&self, ids: &[String]) -> Result<()> {
        self.store().await?.delete_documents(ids).await
    }

    pub async fn update_document(&self, id: &str, entry: IndexEntry) -> Result<()> {
        self.store().await?.update_document(id, entry).await
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<StoredDocument>> {
        self.store().await?.get_document(id).await
    }

    pub async fn count_documents(&self) -> Result<usize> {
        self.store().await?.count_documents().await
    }

    pub async fn close(&self) -> Result<()> {
        self.store().await?.close().await
    }
}
