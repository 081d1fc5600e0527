//! sdsrag-lexical
//!
//! Tantivy-backed lexical ranking over chunk text. The index lives in RAM,
//! is built once from the chunk store and is read-only afterwards.

pub mod tantivy_utils;

use std::collections::HashMap;

use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, IndexReader, TantivyDocument};
use tracing::debug;

use sdsrag_core::traits::LexicalSearcher;
use sdsrag_core::types::{Chunk, ChunkId, SearchHit, SourceKind};
use sdsrag_core::{Error, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer};

/// BM25-ranked term index over chunk text.
///
/// Scores are monotonically non-increasing in the returned list; equal
/// scores are broken by chunk insertion order, so results are stable across
/// runs for an unchanged corpus.
pub struct LexicalIndex {
    index: Index,
    reader: IndexReader,
    id_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
    positions: HashMap<ChunkId, usize>,
    doc_count: usize,
}

impl LexicalIndex {
    /// Builds the index from the full corpus. An empty corpus is fine; the
    /// index simply returns no hits.
    pub fn build(chunks: &[Chunk]) -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        register_tokenizer(&index);
        let id_field = schema.get_field("id").map_err(|e| Error::Operation(e.to_string()))?;
        let text_field = schema.get_field("text").map_err(|e| Error::Operation(e.to_string()))?;

        // Single writer thread keeps document order aligned with insertion
        // order inside the one segment produced by the single commit.
        let mut writer = index
            .writer_with_num_threads(1, 50_000_000)
            .map_err(|e| Error::Operation(e.to_string()))?;
        let mut positions = HashMap::with_capacity(chunks.len());
        for (pos, chunk) in chunks.iter().enumerate() {
            positions.insert(chunk.id.clone(), pos);
            writer
                .add_document(doc!(
                    id_field => chunk.id.clone(),
                    text_field => chunk.text.clone(),
                ))
                .map_err(|e| Error::Operation(e.to_string()))?;
        }
        writer.commit().map_err(|e| Error::Operation(e.to_string()))?;
        let reader = index.reader().map_err(|e| Error::Operation(e.to_string()))?;

        debug!(chunks = chunks.len(), "built lexical index");
        Ok(Self { index, reader, id_field, text_field, positions, doc_count: chunks.len() })
    }

    pub fn len(&self) -> usize {
        self.doc_count
    }

    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }

    /// Up to `k` hits, best first. Queries are parsed leniently: arbitrary
    /// user text (stray quotes, colons) degrades to whatever terms survive
    /// instead of erroring.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if self.doc_count == 0 || k == 0 {
            return Ok(Vec::new());
        }
        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        let (parsed, _lenient_errors) = parser.parse_query_lenient(query);
        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(k))
            .map_err(|e| Error::Operation(e.to_string()))?;

        let mut scored: Vec<(ChunkId, f32, usize)> = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let stored: TantivyDocument =
                searcher.doc(addr).map_err(|e| Error::Operation(e.to_string()))?;
            let id = stored
                .get_first(self.id_field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let position = self.positions.get(&id).copied().unwrap_or(usize::MAX);
            scored.push((id, score, position));
        }
        // Stable ordering: score descending, ties by insertion order.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.2.cmp(&b.2))
        });

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (id, score, _))| SearchHit { id, score, rank, source: SourceKind::Lexical })
            .collect())
    }
}

impl LexicalSearcher for LexicalIndex {
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        Self::search(self, query, k)
    }
}
