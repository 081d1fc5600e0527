//! sdsrag-vector
//!
//! In-memory cosine nearest-neighbor index over chunk embeddings. Built once
//! from the embedded corpus, read-only afterwards. Dimensionality is agreed
//! at build time; a mismatch is a configuration error, never a per-query
//! failure.

use tracing::debug;

use sdsrag_core::traits::VectorSearcher;
use sdsrag_core::types::{Chunk, ChunkId, SearchHit, SourceKind};
use sdsrag_core::{Error, Result};

/// Cosine similarity of two equal-length vectors, 0.0 when either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Brute-force nearest-neighbor structure over chunk embeddings.
///
/// Entries keep corpus insertion order, which doubles as the tie-break for
/// equal similarities so rankings are reproducible.
pub struct VectorIndex {
    dim: usize,
    entries: Vec<(ChunkId, Vec<f32>)>,
}

impl VectorIndex {
    /// Builds from chunks that already carry embeddings.
    ///
    /// Every chunk must be embedded and all embeddings must share one
    /// dimensionality; violations are `InvalidConfig` so the pipeline fails
    /// at startup rather than at query time. An empty corpus is fine.
    pub fn build(chunks: &[Chunk]) -> Result<Self> {
        let mut dim = 0usize;
        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = chunk.embedding.as_ref().ok_or_else(|| {
                Error::InvalidConfig(format!("chunk '{}' has no embedding", chunk.id))
            })?;
            if embedding.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "chunk '{}' has a zero-length embedding",
                    chunk.id
                )));
            }
            if dim == 0 {
                dim = embedding.len();
            } else if embedding.len() != dim {
                return Err(Error::InvalidConfig(format!(
                    "embedding dimensionality mismatch: chunk '{}' has {} dims, index expects {}",
                    chunk.id,
                    embedding.len(),
                    dim
                )));
            }
            entries.push((chunk.id.clone(), embedding.clone()));
        }
        debug!(chunks = entries.len(), dim, "built vector index");
        Ok(Self { dim, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `k` hits ranked by cosine similarity, best first.
    pub fn search(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query_vec.len() != self.dim {
            return Err(Error::InvalidConfig(format!(
                "query embedding has {} dims, index expects {}",
                query_vec.len(),
                self.dim
            )));
        }
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, (_, embedding))| (pos, cosine_similarity(embedding, query_vec)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (pos, score))| SearchHit {
                id: self.entries[pos].0.clone(),
                score,
                rank,
                source: SourceKind::Vector,
            })
            .collect())
    }
}

impl VectorSearcher for VectorIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        Self::search(self, query_vec, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(id: &str, v: Vec<f32>) -> Chunk {
        Chunk::new(id, "text").with_embedding(v)
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_dimensionality_fails_at_build() {
        let chunks = vec![embedded("a", vec![1.0, 0.0]), embedded("b", vec![1.0, 0.0, 0.0])];
        assert!(matches!(VectorIndex::build(&chunks), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_embedding_fails_at_build() {
        let chunks = vec![Chunk::new("a", "no embedding")];
        assert!(matches!(VectorIndex::build(&chunks), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn nearest_neighbor_ranks_by_similarity() {
        let chunks = vec![
            embedded("x", vec![1.0, 0.0]),
            embedded("y", vec![0.0, 1.0]),
            embedded("mid", vec![0.7, 0.7]),
        ];
        let index = VectorIndex::build(&chunks).expect("build");
        let hits = index.search(&[1.0, 0.0], 2).expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "x");
        assert_eq!(hits[1].id, "mid");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn equal_similarity_ties_follow_insertion_order() {
        let chunks = vec![embedded("first", vec![1.0, 0.0]), embedded("second", vec![1.0, 0.0])];
        let index = VectorIndex::build(&chunks).expect("build");
        let hits = index.search(&[1.0, 0.0], 2).expect("search");
        assert_eq!(hits[0].id, "first");
        assert_eq!(hits[1].id, "second");
    }

    #[test]
    fn empty_index_returns_no_hits_without_dim_check() {
        let index = VectorIndex::build(&[]).expect("build");
        let hits = index.search(&[1.0, 2.0, 3.0], 5).expect("search");
        assert!(hits.is_empty());
    }
}
