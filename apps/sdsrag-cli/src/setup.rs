//! Startup wiring: corpus → embeddings → indexes → guarded pipeline.
//!
//! Everything model-shaped uses the deterministic offline providers from
//! `sdsrag-models`; a deployment talking to real services swaps the
//! `Arc<dyn ...>` values built here and changes nothing else.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use sdsrag_core::config::{ChunkingConfig, Config, RetrievalConfig};
use sdsrag_core::store::ChunkStore;
use sdsrag_core::traits::{Classifier, Embedder};
use sdsrag_core::types::Chunk;
use sdsrag_guard::{InputGuard, OutputGuard};
use sdsrag_hybrid::HybridRetriever;
use sdsrag_lexical::LexicalIndex;
use sdsrag_models::{
    ExtractiveGenerator, HashedEmbedder, KeywordClassifier, LexiconClassifier, OverlapScorer,
};
use sdsrag_pipeline::{GenerationStage, GuardedPipeline};
use sdsrag_vector::VectorIndex;

use crate::corpus::CorpusLoader;

pub type CorpusRetriever = HybridRetriever<LexicalIndex, VectorIndex>;

/// Loads the SDS corpus named by `data.sds_dir` and embeds every chunk.
pub fn load_embedded_chunks(config: &Config, embedder: &dyn Embedder) -> Result<Vec<Chunk>> {
    let data_dir: String =
        config.get("data.sds_dir").unwrap_or_else(|_| "./data/sds".to_string());
    let chunking = config.get::<ChunkingConfig>("chunking").unwrap_or_default();
    let mut chunks = CorpusLoader::new(chunking).load_dir(&PathBuf::from(data_dir))?;
    if chunks.is_empty() {
        return Ok(chunks);
    }

    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} chunks embedded")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    for chunk in &mut chunks {
        let embedding = embedder.embed_one(&chunk.text)?;
        chunk.embedding = Some(embedding);
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!(chunks = chunks.len(), dim = embedder.dim(), "corpus embedded");
    Ok(chunks)
}

pub fn build_retriever(
    chunks: Vec<Chunk>,
    embedder: Arc<dyn Embedder>,
    retrieval: RetrievalConfig,
) -> Result<CorpusRetriever> {
    let lexical = LexicalIndex::build(&chunks)?;
    let vector = VectorIndex::build(&chunks)?;
    let store = Arc::new(ChunkStore::new(chunks)?);
    Ok(HybridRetriever::new(lexical, vector, embedder, store, retrieval)?)
}

/// Builds the full guarded pipeline from configuration.
pub fn build_pipeline(config: &Config) -> Result<GuardedPipeline> {
    let retrieval = config.retrieval()?;
    let guard = config.guard()?;

    let embedder: Arc<dyn Embedder> = Arc::new(HashedEmbedder::default());
    let chunks = load_embedded_chunks(config, embedder.as_ref())?;

    let topic: Option<Arc<dyn Classifier>> = if guard.topic_check {
        Some(Arc::new(LexiconClassifier::from_chunks(&chunks)))
    } else {
        None
    };
    let retriever = build_retriever(chunks, embedder, retrieval.clone())?;

    let input_guard =
        InputGuard::new(&guard, Arc::new(KeywordClassifier::unsafe_content()?), topic)?;
    let output_guard = OutputGuard::new(&guard, Arc::new(OverlapScorer))?;

    let pipeline = GuardedPipeline::new(
        input_guard,
        Arc::new(retriever),
        GenerationStage::new(Arc::new(ExtractiveGenerator)),
        output_guard,
        &retrieval,
    )?;
    Ok(pipeline)
}
