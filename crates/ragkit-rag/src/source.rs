//! Document source client.
//!
//! Thin wrapper over a Notion-style content API: paginated page
//! enumeration, block-tree retrieval, and typed plain-text extraction.
//! Nested blocks are walked with an explicit work queue so arbitrarily
//! deep documents cannot exhaust the stack. No algorithmic logic lives
//! here beyond that traversal.

use std::collections::VecDeque;

use serde_json::{json, Value};
use tracing::{error, info};

use ragkit_core::chunker::TextChunker;
use ragkit_core::config::SourceSettings;
use ragkit_core::error::{Error, Result};
use ragkit_core::types::{Chunk, Meta};

pub struct SourceClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    database_id: Option<String>,
    page_size: usize,
}

impl SourceClient {
    /// Missing credentials fail fast here, before any request is issued.
    pub fn new(settings: &SourceSettings) -> Result<Self> {
        if settings.token.is_empty() {
            return Err(Error::InvalidConfig("source.token is required".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            database_id: settings.database_id.clone(),
            page_size: settings.page_size,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.endpoint, path);
        self.client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("source request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Backend(format!("source request rejected: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Backend(format!("invalid source response: {e}")))
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.endpoint, path);
        self.client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("source request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Backend(format!("source request rejected: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Backend(format!("invalid source response: {e}")))
    }

    /// Fetch pages by explicit ids, or enumerate the configured database
    /// (falling back to a workspace-wide page search), following
    /// `next_cursor` pagination to the end.
    pub async fn fetch_pages(&self, ids: Option<&[String]>) -> Result<Vec<Value>> {
        let mut pages = Vec::new();

        if let Some(ids) = ids {
            for id in ids {
                match self.get(&format!("/pages/{id}"), &[]).await {
                    Ok(page) => {
                        info!(page_id = %id, "fetched page");
                        pages.push(page);
                    }
                    Err(err) => {
                        // One bad id must not block the rest of the fetch.
                        error!(page_id = %id, error = %err, "failed to fetch page");
                    }
                }
            }
            return Ok(pages);
        }

        let mut cursor: Option<String> = None;
        loop {
            let mut body = match &self.database_id {
                Some(_) => json!({ "page_size": self.page_size }),
                None => json!({
                    "filter": { "property": "object", "value": "page" },
                    "page_size": self.page_size,
                }),
            };
            if let Some(cursor) = &cursor {
                body["start_cursor"] = Value::String(cursor.clone());
            }
            let path = match &self.database_id {
                Some(db) => format!("/databases/{db}/query"),
                None => "/search".to_string(),
            };
            let response = self.post(&path, body).await?;

            if let Some(results) = response.get("results").and_then(Value::as_array) {
                pages.extend(results.iter().cloned());
            }
            let has_more = response
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !has_more {
                break;
            }
            cursor = response
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        info!(count = pages.len(), "fetched pages from workspace");
        Ok(pages)
    }

    /// Fetch every block under `page_id`, breadth-first. Blocks flagged
    /// `has_children` are queued for traversal instead of recursed into.
    pub async fn fetch_blocks(&self, page_id: &str) -> Result<Vec<Value>> {
        let mut blocks = Vec::new();
        let mut queue: VecDeque<String> = VecDeque::from([page_id.to_string()]);

        while let Some(parent_id) = queue.pop_front() {
            let mut cursor: Option<String> = None;
            loop {
                let mut query = vec![("page_size", self.page_size.to_string())];
                if let Some(cursor) = &cursor {
                    query.push(("start_cursor", cursor.clone()));
                }
                let response = self
                    .get(&format!("/blocks/{parent_id}/children"), &query)
                    .await?;

                if let Some(results) = response.get("results").and_then(Value::as_array) {
                    for block in results {
                        let has_children = block
                            .get("has_children")
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        if has_children {
                            if let Some(id) = block.get("id").and_then(Value::as_str) {
                                queue.push_back(id.to_string());
                            }
                        }
                        blocks.push(block.clone());
                    }
                }
                let has_more = response
                    .get("has_more")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if !has_more {
                    break;
                }
                cursor = response
                    .get("next_cursor")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if cursor.is_none() {
                    break;
                }
            }
        }

        Ok(blocks)
    }

    /// Extract a page's full text and wrap it into metadata-carrying
    /// chunks.
    pub async fn page_to_chunks(
        &self,
        page: &Value,
        chunker: &TextChunker,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<Chunk>> {
        let page_id = page
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Backend("page object has no id".into()))?;
        let title = page_title(page);

        let blocks = self.fetch_blocks(page_id).await?;
        let texts: Vec<String> = blocks.iter().filter_map(block_text).collect();
        let full_text = texts.join("\n\n");

        let mut base_meta = Meta::new();
        base_meta.insert("page_id".to_string(), page_id.to_string());
        base_meta.insert("page_title".to_string(), title);
        for (meta_key, page_key) in [
            ("created_at", "created_time"),
            ("last_edited", "last_edited_time"),
            ("url", "url"),
        ] {
            if let Some(value) = page.get(page_key).and_then(Value::as_str) {
                base_meta.insert(meta_key.to_string(), value.to_string());
            }
        }

        let chunks = chunker.chunk_document(page_id, &full_text, &base_meta, chunk_size, chunk_overlap);
        info!(page_id, chunks = chunks.len(), "extracted text from page");
        Ok(chunks)
    }
}

/// Extract plain text from one block by its type. Unknown types yield
/// nothing.
pub fn block_text(block: &Value) -> Option<String> {
    let block_type = block.get("type").and_then(Value::as_str)?;
    let payload = block.get(block_type)?;

    let text = match block_type {
        "paragraph" | "heading_1" | "heading_2" | "heading_3" | "bulleted_list_item"
        | "numbered_list_item" | "to_do" | "toggle" | "quote" | "callout" => {
            rich_text(payload.get("rich_text"))
        }
        "code" => {
            let code = rich_text(payload.get("rich_text"));
            let language = payload.get("language").and_then(Value::as_str).unwrap_or("");
            if code.is_empty() {
                String::new()
            } else {
                format!("```{language}\n{code}\n```")
            }
        }
        // Full table extraction would need the row blocks; note the table
        // so surrounding context stays coherent.
        "table" => "[Table content]".to_string(),
        "image" => {
            let caption = rich_text(payload.get("caption"));
            if caption.is_empty() {
                String::new()
            } else {
                format!("Image: {caption}")
            }
        }
        _ => String::new(),
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn rich_text(value: Option<&Value>) -> String {
    let Some(items) = value.and_then(Value::as_array) else {
        return String::new();
    };
    items
        .iter()
        .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

/// The first title-typed property's text, or "Untitled".
pub fn page_title(page: &Value) -> String {
    let Some(properties) = page.get("properties").and_then(Value::as_object) else {
        return "Untitled".to_string();
    };

    for name in ["Name", "Title", "title", "name"] {
        if let Some(prop) = properties.get(name) {
            if let Some(title) = title_property_text(prop) {
                return title;
            }
        }
    }
    for prop in properties.values() {
        if let Some(title) = title_property_text(prop) {
            return title;
        }
    }
    "Untitled".to_string()
}

fn title_property_text(prop: &Value) -> Option<String> {
    if prop.get("type").and_then(Value::as_str) != Some("title") {
        return None;
    }
    let items = prop.get("title").and_then(Value::as_array)?;
    if items.is_empty() {
        return None;
    }
    let text: String = items
        .iter()
        .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
        .collect();
    Some(text)
}
