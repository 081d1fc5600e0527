//! Capability seams injected into the pipeline at construction time.
//!
//! Model invocations (embedding, moderation, generation, confidence
//! scoring) are blocking calls to external services behind these traits, so
//! tests can substitute deterministic doubles for every decision the guards
//! and the generator make. Implementations must be safe for concurrent read
//! access and must not mutate shared state per call.

use crate::error::Result;
use crate::types::{Chunk, Prompt, SearchHit};

/// Produces fixed-length embeddings for texts.
pub trait Embedder: Send + Sync {
    /// Embedding dimensionality. Fixed for the lifetime of the embedder.
    fn dim(&self) -> usize;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut batch = self.embed_batch(&texts)?;
        if batch.is_empty() {
            return Err(crate::Error::external("embedding", "empty batch returned"));
        }
        Ok(batch.remove(0))
    }
}

/// A binary text classifier (moderation, topical relevance).
///
/// `flags` returns true when the text belongs to the classifier's positive
/// class; the guard decides what that means (unsafe, off-topic).
pub trait Classifier: Send + Sync {
    fn flags(&self, text: &str) -> Result<bool>;
}

/// The generation model behind the generation stage.
///
/// Receives the structured grounding prompt; a production client renders it
/// with [`Prompt::render`] and sends one completion request.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &Prompt) -> Result<String>;
}

/// Scores a draft answer's confidence in `[0, 1]` given its grounding.
pub trait ConfidenceScorer: Send + Sync {
    fn score(&self, question: &str, answer: &str, context: &[String]) -> Result<f32>;
}

/// Lexical (term-overlap) index read surface.
pub trait LexicalSearcher: Send + Sync {
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;
}

/// Vector (nearest-neighbor) index read surface.
pub trait VectorSearcher: Send + Sync {
    /// Dimensionality agreed at build time; zero for an empty index.
    fn dim(&self) -> usize;

    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>>;
}

/// Retrieval seam consumed by the orchestrator.
pub trait Retriever: Send + Sync {
    /// Up to `k` chunks, deduplicated by id, best first.
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>>;
}
