use std::collections::HashMap;
use std::fs;

use tempfile::TempDir;

use ragkit_core::config::IndexSettings;
use ragkit_core::error::Error;
use ragkit_core::traits::VectorStore;
use ragkit_core::types::{IndexEntry, Meta};
use ragkit_index::{FlatIndex, VectorIndexService};

const DIM: usize = 4;

fn entry(id: &str, vector: Vec<f32>, text: &str) -> IndexEntry {
    let mut metadata = Meta::new();
    metadata.insert("source_id".to_string(), "src".to_string());
    IndexEntry {
        id: id.to_string(),
        embedding: vector,
        text: text.to_string(),
        metadata,
    }
}

#[tokio::test]
async fn search_on_fresh_index_is_empty_not_an_error() {
    let tmp = TempDir::new().expect("tempdir");
    let index = FlatIndex::new(tmp.path(), DIM);
    index.initialize().await.expect("initialize");

    let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 5).await.expect("search");
    assert!(hits.is_empty());
    assert_eq!(index.count_documents().await.expect("count"), 0);
}

#[tokio::test]
async fn add_and_search_ranks_by_similarity() {
    let tmp = TempDir::new().expect("tempdir");
    let index = FlatIndex::new(tmp.path(), DIM);
    index.initialize().await.expect("initialize");

    index
        .add_documents(vec![
            entry("a", vec![1.0, 0.0, 0.0, 0.0], "east"),
            entry("b", vec![0.0, 1.0, 0.0, 0.0], "north"),
            entry("c", vec![0.7, 0.7, 0.0, 0.0], "northeast"),
        ])
        .await
        .expect("add");

    let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 2).await.expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "a");
    assert!((hits[0].score - 1.0).abs() < 1e-5);
    assert_eq!(hits[1].id, "c");
    assert!(hits[0].score >= hits[1].score, "descending by similarity");
    assert_eq!(hits[0].text, "east");
    assert_eq!(hits[0].metadata.get("source_id").map(String::as_str), Some("src"));
}

#[tokio::test]
async fn short_vector_is_zero_padded_to_the_index_dimension() {
    let tmp = TempDir::new().expect("tempdir");
    let index = FlatIndex::new(tmp.path(), DIM);
    index.initialize().await.expect("initialize");

    index
        .add_documents(vec![entry("short", vec![1.0, 0.0], "padded")])
        .await
        .expect("add");

    // A query along the same leading axis matches exactly, so the pad is
    // at the tail and the stored length equals the index dimension.
    let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 1).await.expect("search");
    assert_eq!(hits[0].id, "short");
    assert!((hits[0].score - 1.0).abs() < 1e-5);

    let rows: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("index.json")).expect("read"))
            .expect("parse");
    let stored = rows[0]["vector"].as_array().expect("vector");
    assert_eq!(stored.len(), DIM);
    assert_eq!(stored[2], 0.0);
    assert_eq!(stored[3], 0.0);
}

#[tokio::test]
async fn long_vector_is_truncated_to_the_index_dimension() {
    let tmp = TempDir::new().expect("tempdir");
    let index = FlatIndex::new(tmp.path(), DIM);
    index.initialize().await.expect("initialize");

    index
        .add_documents(vec![entry("long", vec![1.0, 0.0, 0.0, 0.0, 9.0, 9.0], "truncated")])
        .await
        .expect("add");

    let rows: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("index.json")).expect("read"))
            .expect("parse");
    assert_eq!(rows[0]["vector"].as_array().expect("vector").len(), DIM);
}

#[tokio::test]
async fn state_survives_reopen() {
    let tmp = TempDir::new().expect("tempdir");
    {
        let index = FlatIndex::new(tmp.path(), DIM);
        index.initialize().await.expect("initialize");
        index
            .add_documents(vec![entry("keep", vec![0.0, 1.0, 0.0, 0.0], "durable")])
            .await
            .expect("add");
        index.close().await.expect("close");
    }

    let reopened = FlatIndex::new(tmp.path(), DIM);
    reopened.initialize().await.expect("initialize");
    assert_eq!(reopened.count_documents().await.expect("count"), 1);
    let doc = reopened
        .get_document("keep")
        .await
        .expect("get")
        .expect("present");
    assert_eq!(doc.text, "durable");
}

#[tokio::test]
async fn delete_rebuilds_from_retained_vectors() {
    let tmp = TempDir::new().expect("tempdir");
    let index = FlatIndex::new(tmp.path(), DIM);
    index.initialize().await.expect("initialize");

    index
        .add_documents(vec![
            entry("a", vec![1.0, 0.0, 0.0, 0.0], "east"),
            entry("b", vec![0.0, 1.0, 0.0, 0.0], "north"),
            entry("c", vec![0.0, 0.0, 1.0, 0.0], "up"),
        ])
        .await
        .expect("add");

    index.delete_documents(&["b".to_string()]).await.expect("delete");

    assert_eq!(index.count_documents().await.expect("count"), 2);
    assert!(index.get_document("b").await.expect("get").is_none());

    // Survivors remain searchable with their original vectors.
    let hits = index.search(&[0.0, 0.0, 1.0, 0.0], 3).await.expect("search");
    assert_eq!(hits[0].id, "c");
    assert!(!hits.iter().any(|h| h.id == "b"));

    // Both artifacts were rewritten together.
    let reopened = FlatIndex::new(tmp.path(), DIM);
    reopened.initialize().await.expect("initialize");
    assert_eq!(reopened.count_documents().await.expect("count"), 2);
}

#[tokio::test]
async fn update_replaces_instead_of_duplicating() {
    let tmp = TempDir::new().expect("tempdir");
    let index = FlatIndex::new(tmp.path(), DIM);
    index.initialize().await.expect("initialize");

    index
        .add_documents(vec![entry("doc", vec![1.0, 0.0, 0.0, 0.0], "old text")])
        .await
        .expect("add");
    index
        .update_document("doc", entry("doc", vec![0.0, 1.0, 0.0, 0.0], "new text"))
        .await
        .expect("update");

    assert_eq!(index.count_documents().await.expect("count"), 1);
    let doc = index.get_document("doc").await.expect("get").expect("present");
    assert_eq!(doc.text, "new text");

    let hits = index.search(&[0.0, 1.0, 0.0, 0.0], 10).await.expect("search");
    let matches: Vec<_> = hits.iter().filter(|h| h.id == "doc").collect();
    assert_eq!(matches.len(), 1, "update must not leave a stale row behind");
    assert!((matches[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn corrupt_artifacts_fall_back_to_an_empty_index() {
    let tmp = TempDir::new().expect("tempdir");
    fs::write(tmp.path().join("index.json"), "not json at all").expect("write");
    fs::write(tmp.path().join("documents.json"), "{ broken").expect("write");

    let index = FlatIndex::new(tmp.path(), DIM);
    index.initialize().await.expect("initialize must not fail");
    assert_eq!(index.count_documents().await.expect("count"), 0);
}

#[tokio::test]
async fn service_rejects_operations_before_initialize() {
    let settings = IndexSettings {
        backend: "flat".to_string(),
        data_dir: "./unused".to_string(),
        ..IndexSettings::default()
    };
    let service = VectorIndexService::new(settings, DIM);

    let err = service.count_documents().await.expect_err("must fail fast");
    assert!(matches!(err, Error::NotInitialized));
    let err = service.search(&[0.0; DIM], 5).await.expect_err("must fail fast");
    assert!(matches!(err, Error::NotInitialized));
}

#[tokio::test]
async fn service_rejects_unknown_backend_kind() {
    let settings = IndexSettings {
        backend: "qdrant".to_string(),
        ..IndexSettings::default()
    };
    let service = VectorIndexService::new(settings, DIM);

    let err = service.initialize().await.expect_err("unsupported backend");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[tokio::test]
async fn service_dispatches_to_the_flat_backend() {
    let tmp = TempDir::new().expect("tempdir");
    let settings = IndexSettings {
        backend: "flat".to_string(),
        data_dir: tmp.path().to_string_lossy().into_owned(),
        ..IndexSettings::default()
    };
    let service = VectorIndexService::new(settings, DIM);
    service.initialize().await.expect("initialize");

    let mut metadata = HashMap::new();
    metadata.insert("k".to_string(), "v".to_string());
    service
        .add_documents(vec![IndexEntry {
            id: "one".to_string(),
            embedding: vec![1.0, 0.0, 0.0, 0.0],
            text: "hello".to_string(),
            metadata,
        }])
        .await
        .expect("add");

    assert_eq!(service.count_documents().await.expect("count"), 1);
    let hits = service.search(&[1.0, 0.0, 0.0, 0.0], 1).await.expect("search");
    assert_eq!(hits[0].id, "one");
}
