//! sdsrag-hybrid
//!
//! Fuses lexical and vector rankings into one deterministic list. Each index
//! is overfetched independently, scores are normalized per list, and the
//! weighted combination is sorted with a total tie-break (lexical rank, then
//! vector rank, then chunk id) so identical indexes and query always yield
//! identical output.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use sdsrag_core::config::RetrievalConfig;
use sdsrag_core::store::ChunkStore;
use sdsrag_core::traits::{Embedder, LexicalSearcher, Retriever, VectorSearcher};
use sdsrag_core::types::{Chunk, ChunkId, SearchHit};
use sdsrag_core::{Error, Result};

pub struct HybridRetriever<L, V>
where
    L: LexicalSearcher,
    V: VectorSearcher,
{
    lexical: L,
    vector: V,
    embedder: Arc<dyn Embedder>,
    store: Arc<ChunkStore>,
    cfg: RetrievalConfig,
}

impl<L, V> std::fmt::Debug for HybridRetriever<L, V>
where
    L: LexicalSearcher,
    V: VectorSearcher,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRetriever").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Candidate {
    combined: f32,
    lexical_rank: Option<usize>,
    vector_rank: Option<usize>,
}

impl<L, V> HybridRetriever<L, V>
where
    L: LexicalSearcher,
    V: VectorSearcher,
{
    /// Wires the two indexes together. The embedder's dimensionality must
    /// match the vector index (unless the corpus is empty); a mismatch fails
    /// construction, never a query.
    pub fn new(
        lexical: L,
        vector: V,
        embedder: Arc<dyn Embedder>,
        store: Arc<ChunkStore>,
        cfg: RetrievalConfig,
    ) -> Result<Self> {
        cfg.validate()?;
        if vector.dim() != 0 && vector.dim() != embedder.dim() {
            return Err(Error::InvalidConfig(format!(
                "embedder produces {} dims but vector index was built with {}",
                embedder.dim(),
                vector.dim()
            )));
        }
        Ok(Self { lexical, vector, embedder, store, cfg })
    }

    /// Up to `k` chunks, deduplicated by id, best combined score first.
    ///
    /// Sparse results are not an error: an empty corpus or a query matching
    /// nothing yields an empty list and the pipeline proceeds without
    /// context. Only an embedding-service failure propagates.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let fetch = k.saturating_mul(self.cfg.overfetch);

        let lexical_hits = self.lexical.search(query, fetch)?;
        let vector_hits = if self.vector.dim() == 0 {
            Vec::new()
        } else {
            let query_vec = self.embedder.embed_one(query)?;
            self.vector.search_vec(&query_vec, fetch)?
        };
        debug!(
            lexical = lexical_hits.len(),
            vector = vector_hits.len(),
            k,
            "fusing index results"
        );

        let fused = fuse(
            &lexical_hits,
            &vector_hits,
            self.cfg.lexical_weight,
            self.cfg.vector_weight,
            k,
        );

        Ok(fused.into_iter().filter_map(|id| self.store.get(&id).cloned()).collect())
    }
}

impl<L, V> Retriever for HybridRetriever<L, V>
where
    L: LexicalSearcher,
    V: VectorSearcher,
{
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        Self::retrieve(self, query, k)
    }
}

/// Weighted-score fusion of two ranked lists.
///
/// combined(chunk) = w_lex * normalized_lexical + w_vec * normalized_vector,
/// where a chunk absent from one list contributes 0 for that term and each
/// list is normalized by its own maximum score. A list whose scores are all
/// non-positive (cosine similarity can go negative with a real embedding
/// model) is min-max shifted into [0, 1] instead, so its ranking still
/// contributes.
fn fuse(
    lexical: &[SearchHit],
    vector: &[SearchHit],
    lexical_weight: f32,
    vector_weight: f32,
    k: usize,
) -> Vec<ChunkId> {
    let mut candidates: HashMap<ChunkId, Candidate> = HashMap::new();

    let (lex_min, lex_max) = score_bounds(lexical);
    for hit in lexical {
        let entry = candidates.entry(hit.id.clone()).or_default();
        entry.combined += lexical_weight * normalize(hit.score, lex_min, lex_max);
        entry.lexical_rank = Some(hit.rank);
    }
    let (vec_min, vec_max) = score_bounds(vector);
    for hit in vector {
        let entry = candidates.entry(hit.id.clone()).or_default();
        entry.combined += vector_weight * normalize(hit.score, vec_min, vec_max);
        entry.vector_rank = Some(hit.rank);
    }

    let mut merged: Vec<(ChunkId, Candidate)> = candidates.into_iter().collect();
    merged.sort_by(|(id_a, a), (id_b, b)| {
        b.combined
            .partial_cmp(&a.combined)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| rank_or_last(a.lexical_rank).cmp(&rank_or_last(b.lexical_rank)))
            .then_with(|| rank_or_last(a.vector_rank).cmp(&rank_or_last(b.vector_rank)))
            .then_with(|| id_a.cmp(id_b))
    });
    merged.truncate(k);
    merged.into_iter().map(|(id, _)| id).collect()
}

fn score_bounds(hits: &[SearchHit]) -> (f32, f32) {
    hits.iter()
        .map(|h| h.score)
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| (lo.min(s), hi.max(s)))
}

fn normalize(score: f32, min: f32, max: f32) -> f32 {
    if max > 0.0 {
        score / max
    } else if min < max {
        (score - min) / (max - min)
    } else if max < 0.0 {
        // Uniformly negative list: every hit is equally the best of it.
        1.0
    } else {
        // All-zero scores carry no ranking signal.
        0.0
    }
}

fn rank_or_last(rank: Option<usize>) -> usize {
    rank.unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdsrag_core::types::SourceKind;

    fn hit(id: &str, score: f32, rank: usize, source: SourceKind) -> SearchHit {
        SearchHit { id: id.to_string(), score, rank, source }
    }

    #[test]
    fn disjoint_lists_union_up_to_k() {
        let lexical = vec![
            hit("a", 3.0, 0, SourceKind::Lexical),
            hit("b", 2.0, 1, SourceKind::Lexical),
        ];
        let vector = vec![
            hit("c", 0.9, 0, SourceKind::Vector),
            hit("d", 0.8, 1, SourceKind::Vector),
        ];
        let fused = fuse(&lexical, &vector, 0.5, 0.5, 10);
        assert_eq!(fused.len(), 4);
        let truncated = fuse(&lexical, &vector, 0.5, 0.5, 3);
        assert_eq!(truncated.len(), 3);
    }

    #[test]
    fn chunk_in_both_lists_outranks_single_list_chunks() {
        let lexical = vec![
            hit("both", 2.0, 0, SourceKind::Lexical),
            hit("lex_only", 2.0, 1, SourceKind::Lexical),
        ];
        let vector = vec![
            hit("both", 0.8, 0, SourceKind::Vector),
            hit("vec_only", 0.8, 1, SourceKind::Vector),
        ];
        let fused = fuse(&lexical, &vector, 0.5, 0.5, 3);
        assert_eq!(fused[0], "both");
    }

    #[test]
    fn never_returns_duplicate_ids() {
        let lexical = vec![hit("a", 3.0, 0, SourceKind::Lexical)];
        let vector = vec![hit("a", 0.9, 0, SourceKind::Vector)];
        let fused = fuse(&lexical, &vector, 0.5, 0.5, 5);
        assert_eq!(fused, vec!["a".to_string()]);
    }

    #[test]
    fn ties_break_by_lexical_then_vector_rank_then_id() {
        // Identical combined scores; the lexical-ranked chunk must win.
        let lexical = vec![hit("lex", 1.0, 0, SourceKind::Lexical)];
        let vector = vec![hit("vec", 1.0, 0, SourceKind::Vector)];
        let fused = fuse(&lexical, &vector, 0.5, 0.5, 2);
        assert_eq!(fused, vec!["lex".to_string(), "vec".to_string()]);

        // Same list, same score: normalized scores tie, earlier rank wins.
        let lexical = vec![
            hit("zz", 2.0, 0, SourceKind::Lexical),
            hit("aa", 2.0, 1, SourceKind::Lexical),
        ];
        let fused = fuse(&lexical, &[], 1.0, 0.0, 2);
        assert_eq!(fused, vec!["zz".to_string(), "aa".to_string()]);
    }

    #[test]
    fn fusion_is_deterministic() {
        let lexical = vec![
            hit("a", 2.0, 0, SourceKind::Lexical),
            hit("b", 2.0, 1, SourceKind::Lexical),
            hit("c", 1.0, 2, SourceKind::Lexical),
        ];
        let vector = vec![
            hit("c", 0.9, 0, SourceKind::Vector),
            hit("b", 0.9, 1, SourceKind::Vector),
        ];
        let first = fuse(&lexical, &vector, 0.5, 0.5, 3);
        for _ in 0..10 {
            assert_eq!(fuse(&lexical, &vector, 0.5, 0.5, 3), first);
        }
    }

    #[test]
    fn negative_vector_scores_still_contribute() {
        // Cosine similarity can be negative with a real embedding model; the
        // vector ranking must keep boosting the chunks it places on top.
        let lexical = vec![
            hit("lex_top", 1.0, 0, SourceKind::Lexical),
            hit("shared", 0.5, 1, SourceKind::Lexical),
        ];
        let vector = vec![
            hit("shared", -0.1, 0, SourceKind::Vector),
            hit("vec_only", -0.9, 1, SourceKind::Vector),
        ];
        // shared = 0.5*0.5 + 0.5*1.0, ahead of the lexical-only leader.
        let fused = fuse(&lexical, &vector, 0.5, 0.5, 3);
        assert_eq!(
            fused,
            vec!["shared".to_string(), "lex_top".to_string(), "vec_only".to_string()]
        );
    }

    #[test]
    fn empty_lists_fuse_to_empty() {
        assert!(fuse(&[], &[], 0.5, 0.5, 3).is_empty());
    }
}
