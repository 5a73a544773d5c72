use std::env;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use ragkit_core::chunker::TextChunker;
use ragkit_core::config::Config;
use ragkit_core::types::IndexingStats;
use ragkit_embed::{default_backend, EmbeddingGateway};
use ragkit_index::VectorIndexService;
use ragkit_rag::{IndexingPipeline, SourceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut force_reindex = false;
    let mut limit: Option<usize> = None;
    let mut page_ids: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--force" | "-f" => force_reindex = true,
            "--limit" => {
                if i + 1 < args.len() {
                    if let Ok(n) = args[i + 1].parse::<usize>() {
                        limit = Some(n);
                        i += 1;
                    } else {
                        eprintln!("Error: --limit requires a number");
                        std::process::exit(1);
                    }
                } else {
                    eprintln!("Error: --limit requires a number");
                    std::process::exit(1);
                }
            }
            _ if !args[i].starts_with('-') => page_ids.push(args[i].clone()),
            _ => {}
        }
        i += 1;
    }

    println!("ragkit Indexer\n==============");
    println!("Index backend: {}", settings.index.backend);
    if force_reindex {
        println!("⚠️  Force reindex enabled (content hashes ignored)");
    }

    let source = SourceClient::new(&settings.source)?;
    let chunker = TextChunker::default();
    let gateway = Arc::new(EmbeddingGateway::new(default_backend(&settings.embedding)?));
    let index = Arc::new(VectorIndexService::new(
        settings.index.clone(),
        settings.embedding.dimension,
    ));
    let pipeline = IndexingPipeline::new(gateway, index);

    let ids = if page_ids.is_empty() { None } else { Some(page_ids.as_slice()) };
    let mut pages = source.fetch_pages(ids).await?;
    if let Some(limit) = limit {
        if pages.len() > limit {
            pages.truncate(limit);
            println!("🔢 Limited to first {} pages", limit);
        }
    }
    println!("Fetched {} pages", pages.len());

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    let mut totals = IndexingStats::default();
    for page in &pages {
        let page_id = page
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        pb.set_message(format!("indexing {}", page_id));
        let chunks = source
            .page_to_chunks(
                page,
                &chunker,
                settings.chunking.chunk_size,
                settings.chunking.chunk_overlap,
            )
            .await?;
        let stats = pipeline.index_chunks(&chunks, &page_id, force_reindex).await?;
        totals.total_chunks += stats.total_chunks;
        totals.indexed += stats.indexed;
        totals.skipped += stats.skipped;
        totals.failed += stats.failed;
        pb.inc(1);
    }
    pb.finish_with_message("done");

    println!("\n✅ Indexing completed successfully!");
    println!(
        "📊 {} chunks total: {} indexed, {} skipped, {} failed",
        totals.total_chunks, totals.indexed, totals.skipped, totals.failed
    );
    let stats = pipeline.indexing_stats().await?;
    println!(
        "📊 Index now holds {} documents ({} backend, dim {})",
        stats.total_documents, stats.backend, stats.embedding_dimension
    );
    println!("\n💡 To search, use: cargo run --bin ragkit-search '<query>'");
    println!("💡 To ask a question, use: cargo run --bin ragkit-query '<question>'");
    Ok(())
}
