//! Loads a directory of plain-text safety data sheets into chunks.
//!
//! One `.txt` file per product; the file stem is the product name recorded
//! as chunk provenance. Paragraphs are the chunking unit, with a word-window
//! split and overlap for paragraphs exceeding the token budget.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use sdsrag_core::config::ChunkingConfig;
use sdsrag_core::types::{Chunk, PROVENANCE_KEY};

#[derive(Default)]
pub struct CorpusLoader {
    chunking: ChunkingConfig,
}

impl CorpusLoader {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    pub fn load_dir(&self, data_dir: &Path) -> Result<Vec<Chunk>> {
        let files = list_txt_files(data_dir);
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no .txt files found");
            return Ok(vec![]);
        }
        let mut all_chunks = Vec::new();
        for file_path in &files {
            let content = read_file_content(file_path)?;
            let product = product_name(file_path);
            let chunks = self.chunk_content(&content, &product);
            debug!(product = %product, chunks = chunks.len(), "chunked file");
            all_chunks.extend(chunks);
        }
        info!(files = files.len(), chunks = all_chunks.len(), "corpus loaded");
        Ok(all_chunks)
    }

    fn chunk_content(&self, content: &str, product: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut chunk_index = 0;
        for paragraph in content.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if estimate_tokens(paragraph) <= self.chunking.max_tokens {
                chunks.push(self.make_chunk(product, chunk_index, paragraph.to_string()));
                chunk_index += 1;
            } else {
                for piece in self.split_with_overlap(paragraph) {
                    chunks.push(self.make_chunk(product, chunk_index, piece));
                    chunk_index += 1;
                }
            }
        }
        chunks
    }

    fn make_chunk(&self, product: &str, index: usize, text: String) -> Chunk {
        Chunk::new(format!("{product}:{index}"), text).with_metadata(PROVENANCE_KEY, product)
    }

    fn split_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let words_per_chunk = ((self.chunking.max_tokens as f32) * 0.75).max(1.0) as usize;
        let overlap_words = (words_per_chunk as f32 * self.chunking.overlap_percent) as usize;
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            pieces.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start = end - overlap_words.min(end - 1);
        }
        pieces
    }
}

/// Word-count based token estimate, same heuristic for all texts.
fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

fn product_name(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
    }
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            txt_files.push(path.to_path_buf());
        }
    }
    txt_files.sort();
    txt_files
}
