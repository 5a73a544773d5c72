use std::env;
use std::sync::Arc;

use ragkit_core::config::Config;
use ragkit_embed::{default_backend, EmbeddingGateway};
use ragkit_index::VectorIndexService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [--limit N]", args[0]);
        eprintln!("Example: {} 'quarterly planning notes' --limit 5", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];
    let mut limit = 10usize;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--limit" => {
                if i + 1 < args.len() {
                    if let Ok(n) = args[i + 1].parse::<usize>() {
                        limit = n;
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
            _ => {}
        }
        i += 1;
    }

    let config = Config::load()?;
    let settings = config.settings()?;

    println!("🔍 ragkit-search\n================");
    println!("Query: {}", query_text);
    println!("Backend: {}", settings.index.backend);

    let gateway = Arc::new(EmbeddingGateway::new(default_backend(&settings.embedding)?));
    let index = VectorIndexService::new(settings.index.clone(), settings.embedding.dimension);
    index.initialize().await?;

    let query_vector = gateway.embed_query(query_text).await?;
    let results = index.search(&query_vector, limit).await?;

    println!("\n🔍 Found {} results for: \"{}\"", results.len(), query_text);
    for (i, result) in results.iter().enumerate() {
        let title = result
            .metadata
            .get("page_title")
            .map(String::as_str)
            .unwrap_or("Untitled");
        println!(
            "\n  {}. score={:.4}  id={}  title={}",
            i + 1,
            result.score,
            result.id,
            title
        );
        let preview: String = result.text.chars().take(200).collect();
        println!("     📝 Content: {}", preview);
    }
    Ok(())
}
