//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars into the typed [`Settings`] tree. Provides helpers to expand `~`
//! and `${VAR}` and to resolve relative paths against a known base
//! directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        // Nested keys use a double underscore: APP_EMBEDDING__API_KEY.
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("failed to get '{}': {}", key, e)))
    }

    /// Extract the full typed settings tree, applying section defaults for
    /// anything the merged sources leave unset.
    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("failed to load settings: {}", e)))
    }
}

/// Top-level typed settings. Every section has serde defaults so a missing
/// `config.toml` still yields a usable (if credential-less) configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub index: IndexSettings,
    pub chunking: ChunkingSettings,
    pub query: QuerySettings,
}

/// Remote document source (paginated pages with nested block trees).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub endpoint: String,
    pub token: String,
    /// Optional collection to enumerate; without it the whole workspace is
    /// searched for pages.
    pub database_id: Option<String>,
    pub page_size: usize,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.notion.com/v1".to_string(),
            token: String::new(),
            database_id: None,
            page_size: 100,
        }
    }
}

/// Remote embedding backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub dimension: usize,
    /// Largest batch the backend accepts in one call.
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            batch_size: 100,
        }
    }
}

/// Remote answer generation backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1500,
        }
    }
}

/// Vector index backend selection and persistence location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// `"flat"` (in-process, file-backed) or `"remote"` (managed service).
    pub backend: String,
    pub data_dir: String,
    pub remote_endpoint: String,
    pub remote_api_key: String,
    pub namespace: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: "flat".to_string(),
            data_dir: "./data/index".to_string(),
            remote_endpoint: String::new(),
            remote_api_key: String::new(),
            namespace: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 500, chunk_overlap: 50 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub top_k: usize,
    pub temperature: f32,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self { top_k: 5, temperature: 0.7 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. If `p` is absolute, it's returned as-is; otherwise
/// `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
