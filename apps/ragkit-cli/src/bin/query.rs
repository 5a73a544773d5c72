use std::env;
use std::sync::Arc;

use ragkit_core::config::Config;
use ragkit_embed::{default_backend, EmbeddingGateway};
use ragkit_index::VectorIndexService;
use ragkit_rag::{AnswerPipeline, OpenAiGeneration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <question> [--top-k N] [--temperature T]", args[0]);
        eprintln!("Example: {} 'What did we decide about the Q3 launch?'", args[0]);
        std::process::exit(1);
    }
    let question = &args[1];

    let config = Config::load()?;
    let settings = config.settings()?;

    let mut top_k = settings.query.top_k;
    let mut temperature = settings.query.temperature;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--top-k" => {
                if i + 1 < args.len() {
                    if let Ok(n) = args[i + 1].parse::<usize>() {
                        top_k = n;
                        i += 1;
                    } else {
                        eprintln!("Error: --top-k requires a number");
                        std::process::exit(1);
                    }
                } else {
                    eprintln!("Error: --top-k requires a number");
                    std::process::exit(1);
                }
            }
            "--temperature" => {
                if i + 1 < args.len() {
                    if let Ok(t) = args[i + 1].parse::<f32>() {
                        temperature = t;
                        i += 1;
                    } else {
                        eprintln!("Error: --temperature requires a number");
                        std::process::exit(1);
                    }
                } else {
                    eprintln!("Error: --temperature requires a number");
                    std::process::exit(1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    println!("💬 ragkit-query\n===============");
    println!("Question: {}", question);

    let gateway = Arc::new(EmbeddingGateway::new(default_backend(&settings.embedding)?));
    let index = Arc::new(VectorIndexService::new(
        settings.index.clone(),
        settings.embedding.dimension,
    ));
    let generation = Arc::new(OpenAiGeneration::new(&settings.generation)?);
    let pipeline = AnswerPipeline::new(gateway, index, generation, settings.generation.max_tokens);

    let result = pipeline.answer(question, top_k, temperature).await?;

    println!("\n🤖 Answer ({}):\n{}", result.model_used, result.answer);
    if !result.sources.is_empty() {
        println!("\n📚 Sources:");
        for (i, source) in result.sources.iter().enumerate() {
            println!(
                "  {}. {} (score {:.2}, chunk {}/{})",
                i + 1,
                source.title,
                source.score,
                source.chunk_index + 1,
                source.total_chunks
            );
            if !source.url.is_empty() {
                println!("     🔗 {}", source.url);
            }
        }
    }
    Ok(())
}
