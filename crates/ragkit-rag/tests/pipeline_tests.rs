use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use ragkit_core::config::IndexSettings;
use ragkit_core::error::{Error, Result};
use ragkit_core::traits::GenerationBackend;
use ragkit_core::types::{Chunk, Meta};
use ragkit_embed::{EmbeddingGateway, FakeEmbeddings};
use ragkit_index::VectorIndexService;
use ragkit_rag::answerer::NO_MATCH_ANSWER;
use ragkit_rag::{AnswerPipeline, IndexingPipeline};

const DIM: usize = 64;

fn gateway() -> Arc<EmbeddingGateway> {
    Arc::new(EmbeddingGateway::new(Arc::new(FakeEmbeddings::new(DIM))))
}

fn index_service(tmp: &TempDir) -> Arc<VectorIndexService> {
    let settings = IndexSettings {
        backend: "flat".to_string(),
        data_dir: tmp.path().to_string_lossy().into_owned(),
        ..IndexSettings::default()
    };
    Arc::new(VectorIndexService::new(settings, DIM))
}

fn make_chunks(texts: &[&str]) -> Vec<Chunk> {
    let total = texts.len();
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = Meta::new();
            metadata.insert("page_title".to_string(), "Field Notes".to_string());
            metadata.insert("chunk_index".to_string(), i.to_string());
            metadata.insert("total_chunks".to_string(), total.to_string());
            Chunk {
                text: text.to_string(),
                source_id: "page-1".to_string(),
                chunk_index: i,
                total_chunks: total,
                metadata,
            }
        })
        .collect()
}

/// Canned generation backend that records whether it was invoked.
struct ScriptedGeneration {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedGeneration {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl GenerationBackend for ScriptedGeneration {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        _system: &str,
        user: &str,
        _temperature: f32,
        _max_tokens: usize,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(user.contains("Question:"), "user turn must carry the query");
        Ok(self.reply.clone())
    }
}

#[tokio::test]
async fn indexing_twice_is_idempotent() {
    let tmp = TempDir::new().expect("tempdir");
    let pipeline = IndexingPipeline::new(gateway(), index_service(&tmp));

    let chunks = make_chunks(&[
        "The garden beds were planted in April.",
        "Tomatoes need staking by June.",
        "The well pump was serviced last fall.",
    ]);

    let first = pipeline.index_chunks(&chunks, "page-1", false).await.expect("first run");
    assert_eq!(first.total_chunks, 3);
    assert_eq!(first.indexed, 3);
    assert_eq!(first.skipped, 0);

    let second = pipeline.index_chunks(&chunks, "page-1", false).await.expect("second run");
    assert_eq!(second.indexed, 0);
    assert_eq!(second.skipped, 3);
}

#[tokio::test]
async fn changed_chunk_is_the_only_one_reindexed() {
    let tmp = TempDir::new().expect("tempdir");
    let pipeline = IndexingPipeline::new(gateway(), index_service(&tmp));

    let chunks = make_chunks(&["one alpha", "two bravo", "three charlie"]);
    pipeline.index_chunks(&chunks, "page-1", false).await.expect("seed");

    let changed = make_chunks(&["one alpha", "two bravo EDITED", "three charlie"]);
    let stats = pipeline.index_chunks(&changed, "page-1", false).await.expect("rerun");
    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.skipped, 2);
}

#[tokio::test]
async fn force_reindex_embeds_everything_again() {
    let tmp = TempDir::new().expect("tempdir");
    let pipeline = IndexingPipeline::new(gateway(), index_service(&tmp));

    let chunks = make_chunks(&["one", "two"]);
    pipeline.index_chunks(&chunks, "page-1", false).await.expect("seed");

    let stats = pipeline.index_chunks(&chunks, "page-1", true).await.expect("forced");
    assert_eq!(stats.indexed, 2);
    assert_eq!(stats.skipped, 0);
}

#[tokio::test]
async fn reindexed_chunks_overwrite_under_the_same_id() {
    let tmp = TempDir::new().expect("tempdir");
    let index = index_service(&tmp);
    let pipeline = IndexingPipeline::new(gateway(), index.clone());

    let chunks = make_chunks(&["original text here"]);
    pipeline.index_chunks(&chunks, "page-1", false).await.expect("seed");

    let doc = index.get_document("page-1_0").await.expect("get").expect("present");
    assert_eq!(doc.text, "original text here");
    assert_eq!(doc.metadata.get("source_id").map(String::as_str), Some("page-1"));
    assert!(doc.metadata.contains_key("content_hash"));
}

#[tokio::test]
async fn delete_source_chunks_walks_the_id_sequence() {
    let tmp = TempDir::new().expect("tempdir");
    let index = index_service(&tmp);
    let pipeline = IndexingPipeline::new(gateway(), index.clone());

    let chunks = make_chunks(&["a", "b", "c", "d"]);
    pipeline.index_chunks(&chunks, "page-1", false).await.expect("seed");
    assert_eq!(index.count_documents().await.expect("count"), 4);

    let deleted = pipeline.delete_source_chunks("page-1").await.expect("delete");
    assert_eq!(deleted, 4);
    assert_eq!(index.count_documents().await.expect("count"), 0);

    // Deleting an absent source is a no-op, not an error.
    let deleted = pipeline.delete_source_chunks("page-1").await.expect("delete again");
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn answer_on_empty_index_returns_the_no_match_response() {
    let tmp = TempDir::new().expect("tempdir");
    let generation = ScriptedGeneration::new("should never be used");
    let pipeline = AnswerPipeline::new(gateway(), index_service(&tmp), generation.clone(), 500);

    let result = pipeline.answer("unrelated query", 5, 0.7).await.expect("answer");
    assert_eq!(result.answer, NO_MATCH_ANSWER);
    assert!(result.sources.is_empty());
    assert_eq!(
        generation.calls.load(Ordering::SeqCst),
        0,
        "no generation call without retrieved context"
    );
}

#[tokio::test]
async fn answer_grounds_in_retrieved_chunks() {
    let tmp = TempDir::new().expect("tempdir");
    let index = index_service(&tmp);
    let indexer = IndexingPipeline::new(gateway(), index.clone());

    let long_tail = "planting schedule details ".repeat(40);
    let first_text = format!("The tomatoes were planted in raised beds. {long_tail}");
    let chunks = make_chunks(&[first_text.as_str(), "The pump house sits behind the barn."]);
    indexer.index_chunks(&chunks, "page-1", false).await.expect("seed");

    let generation = ScriptedGeneration::new("Tomatoes live in the raised beds.");
    let pipeline = AnswerPipeline::new(gateway(), index, generation.clone(), 500);

    let result = pipeline
        .answer("Where were the tomatoes planted?", 2, 0.2)
        .await
        .expect("answer");

    assert_eq!(result.answer, "Tomatoes live in the raised beds.");
    assert_eq!(result.model_used, "scripted-model");
    assert_eq!(generation.calls.load(Ordering::SeqCst), 1);
    assert!(!result.sources.is_empty());
    for source in &result.sources {
        assert!(source.text.chars().count() <= 500, "source previews are truncated");
        assert_eq!(source.title, "Field Notes");
        assert_eq!(source.source_id, "page-1");
    }
}

#[tokio::test]
async fn empty_query_propagates_as_input_validation_failure() {
    let tmp = TempDir::new().expect("tempdir");
    let generation = ScriptedGeneration::new("unused");
    let pipeline = AnswerPipeline::new(gateway(), index_service(&tmp), generation, 500);

    let err = pipeline.answer("  ", 5, 0.7).await.expect_err("must reject");
    assert!(matches!(err, Error::InvalidInput(_)));
}
