//! Immutable owner of all indexed chunks.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkId};

/// Holds every chunk once, in insertion order, with id lookup.
///
/// Built once at startup and never mutated; the indexes reference chunks by
/// id and resolve them here after fusion.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
    by_id: HashMap<ChunkId, usize>,
}

impl ChunkStore {
    /// Fails with `InvalidConfig` on duplicate chunk ids; the fusion
    /// tie-break and deduplication both assume ids are unique.
    pub fn new(chunks: Vec<Chunk>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(chunks.len());
        for (pos, chunk) in chunks.iter().enumerate() {
            if by_id.insert(chunk.id.clone(), pos).is_some() {
                return Err(Error::InvalidConfig(format!("duplicate chunk id '{}'", chunk.id)));
            }
        }
        Ok(Self { chunks, by_id })
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.by_id.get(id).map(|&pos| &self.chunks[pos])
    }

    /// Insertion position of a chunk, used as the stable tie-break order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
