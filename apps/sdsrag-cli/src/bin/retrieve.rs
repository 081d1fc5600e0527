//! Raw hybrid retrieval without guards or generation, for debugging
//! ranking behavior against a corpus.

use std::env;
use std::sync::Arc;

use sdsrag_cli::setup;
use sdsrag_core::config::Config;
use sdsrag_models::HashedEmbedder;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let query = args.first().cloned().unwrap_or_else(|| {
        eprintln!("Usage: sdsrag-retrieve \"<query>\" [k]");
        std::process::exit(1)
    });

    let config = Config::load()?;
    let retrieval = config.retrieval()?;
    let k = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(retrieval.k);

    let embedder = Arc::new(HashedEmbedder::default());
    let chunks = setup::load_embedded_chunks(&config, embedder.as_ref())?;
    let retriever = setup::build_retriever(chunks, embedder, retrieval)?;

    let results = retriever.retrieve(&query, k)?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (rank, chunk) in results.iter().enumerate() {
        let snippet: String = chunk.text.chars().take(120).collect();
        println!("{:>2}. [{}] {}: {}", rank + 1, chunk.provenance(), chunk.id, snippet);
    }
    Ok(())
}
