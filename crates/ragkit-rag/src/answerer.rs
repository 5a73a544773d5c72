//! Retrieval-answering pipeline: query embedding, similarity search,
//! context assembly, and grounded answer generation.

use std::sync::Arc;

use tracing::{info, warn};

use ragkit_core::error::Result;
use ragkit_core::traits::GenerationBackend;
use ragkit_core::types::{RagAnswer, SearchResult, SourceRef};
use ragkit_embed::EmbeddingGateway;
use ragkit_index::VectorIndexService;

/// Returned when the index holds nothing relevant. A normal outcome, not
/// a failure.
pub const NO_MATCH_ANSWER: &str = "No relevant information was found in the indexed documents. \
     Index your source documents first.";

const SYSTEM_PROMPT: &str = "\
You are a helpful assistant that answers questions based on the provided source documents.

Instructions:
1. Answer in the same language as the question.
2. Base your answer ONLY on the provided context.
3. If the information is not in the context, say you don't have that information.
4. Be concise but comprehensive.
5. When referencing information, mention which document it comes from.
6. Use markdown formatting when appropriate for better readability.";

const CONTEXT_DELIMITER: &str = "\n\n---\n\n";
/// Each returned source keeps at most this many characters of text; the
/// full text only reaches the generation backend.
const SOURCE_PREVIEW_CHARS: usize = 500;

pub struct AnswerPipeline {
    gateway: Arc<EmbeddingGateway>,
    index: Arc<VectorIndexService>,
    generation: Arc<dyn GenerationBackend>,
    max_tokens: usize,
}

impl AnswerPipeline {
    pub fn new(
        gateway: Arc<EmbeddingGateway>,
        index: Arc<VectorIndexService>,
        generation: Arc<dyn GenerationBackend>,
        max_tokens: usize,
    ) -> Self {
        Self {
            gateway,
            index,
            generation,
            max_tokens,
        }
    }

    /// Answer `query` from the `top_k` most similar indexed chunks.
    ///
    /// An empty query is an input-validation failure and propagates; an
    /// empty result set yields the fixed no-information answer with no
    /// sources.
    pub async fn answer(&self, query: &str, top_k: usize, temperature: f32) -> Result<RagAnswer> {
        if !self.index.is_initialized().await {
            self.index.initialize().await?;
        }

        let query_embedding = self.gateway.embed_query(query).await?;

        let hits = self.index.search(&query_embedding, top_k).await?;
        if hits.is_empty() {
            warn!(query_len = query.len(), "no relevant documents found");
            return Ok(RagAnswer {
                answer: NO_MATCH_ANSWER.to_string(),
                sources: Vec::new(),
                model_used: self.generation.model().to_string(),
                query: query.to_string(),
            });
        }

        let context = build_context(&hits);
        let user_prompt = format!(
            "Context from source documents:\n\n{context}\n\n---\n\n\
             Question: {query}\n\n\
             Please provide a comprehensive answer based on the above context."
        );

        let answer = self
            .generation
            .complete(SYSTEM_PROMPT, &user_prompt, temperature, self.max_tokens)
            .await?;

        info!(
            sources = hits.len(),
            answer_len = answer.len(),
            "query answered"
        );

        Ok(RagAnswer {
            answer,
            sources: hits.iter().map(format_source).collect(),
            model_used: self.generation.model().to_string(),
            query: query.to_string(),
        })
    }

    /// Probe every collaborator once for operational reporting.
    pub async fn validate_configuration(&self) -> ConfigurationStatus {
        let embeddings = self.gateway.validate_backend().await;

        let mut vector_index = false;
        let mut documents_indexed = false;
        if self.index.is_initialized().await || self.index.initialize().await.is_ok() {
            if let Ok(count) = self.index.count_documents().await {
                vector_index = true;
                documents_indexed = count > 0;
            }
        }

        ConfigurationStatus {
            embeddings,
            vector_index,
            documents_indexed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigurationStatus {
    pub embeddings: bool,
    pub vector_index: bool,
    pub documents_indexed: bool,
}

/// Concatenate retrieved texts under per-entry headers carrying the
/// source title and similarity score, best match first.
fn build_context(hits: &[SearchResult]) -> String {
    let parts: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let title = hit
                .metadata
                .get("page_title")
                .map(String::as_str)
                .unwrap_or("Untitled");
            format!(
                "[Document {} - {} (relevance: {:.2})]\n{}",
                i + 1,
                title,
                hit.score,
                hit.text
            )
        })
        .collect();
    parts.join(CONTEXT_DELIMITER)
}

fn format_source(hit: &SearchResult) -> SourceRef {
    SourceRef {
        source_id: hit
            .metadata
            .get("source_id")
            .cloned()
            .unwrap_or_else(|| hit.id.clone()),
        title: hit
            .metadata
            .get("page_title")
            .cloned()
            .unwrap_or_else(|| "Untitled".to_string()),
        text: hit.text.chars().take(SOURCE_PREVIEW_CHARS).collect(),
        score: hit.score,
        chunk_index: hit
            .metadata
            .get("chunk_index")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        total_chunks: hit
            .metadata
            .get("total_chunks")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
        url: hit.metadata.get("url").cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragkit_core::types::Meta;

    fn hit(title: &str, score: f32, text: &str) -> SearchResult {
        let mut metadata = Meta::new();
        metadata.insert("page_title".to_string(), title.to_string());
        SearchResult {
            id: "s_0".to_string(),
            text: text.to_string(),
            metadata,
            score,
        }
    }

    #[test]
    fn context_carries_titles_scores_and_delimiter() {
        let hits = vec![hit("Alpha", 0.91, "first"), hit("Beta", 0.4, "second")];
        let context = build_context(&hits);
        assert!(context.contains("[Document 1 - Alpha (relevance: 0.91)]\nfirst"));
        assert!(context.contains("[Document 2 - Beta (relevance: 0.40)]\nsecond"));
        assert!(context.contains("\n\n---\n\n"));
    }

    #[test]
    fn source_preview_is_truncated() {
        let long = "x".repeat(2000);
        let source = format_source(&hit("Alpha", 0.5, &long));
        assert_eq!(source.text.len(), 500);
    }
}
