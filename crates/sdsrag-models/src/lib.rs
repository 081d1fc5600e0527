//! sdsrag-models
//!
//! Deterministic offline providers for the four model capabilities. These
//! stand in for the real embedding, moderation, generation and guard models
//! when running without network access (CLI offline mode, integration
//! tests). All of them are pure functions of their input.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use regex::RegexSet;
use tracing::debug;
use twox_hash::XxHash64;

use sdsrag_core::traits::{Classifier, ConfidenceScorer, Embedder, Generator};
use sdsrag_core::types::{Chunk, Prompt};
use sdsrag_core::{Error, Result};

/// Words ignored when comparing texts by content overlap.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it", "of",
    "on", "that", "the", "to", "was", "will", "with", "or", "but", "not", "this", "what", "which",
    "when", "where", "how", "why", "who", "required", "does", "do", "did", "have", "had",
];

fn content_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
}

/// Hashed bag-of-words embedder: each token is bucketed by its 64-bit hash
/// and the vector is L2-normalized. Deterministic and dimension-fixed, which
/// is all the vector index needs offline.
pub struct HashedEmbedder {
    dim: usize,
}

impl HashedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Embedder for HashedEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let mut v = vec![0f32; self.dim];
            for token in content_tokens(text) {
                let mut hasher = XxHash64::with_seed(0);
                token.hash(&mut hasher);
                let h = hasher.finish();
                let idx = (h as usize) % self.dim;
                v[idx] += (((h >> 32) as u32) as f32) / (u32::MAX as f32) + 0.5;
            }
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
            for x in &mut v {
                *x /= norm;
            }
            out.push(v);
        }
        Ok(out)
    }
}

/// Pattern-based moderation classifier.
///
/// Flags text matching any pattern in the set. The default deny-list targets
/// prompt-injection and harmful-use phrasings seen against the SDS
/// assistant; production deployments swap in a real moderation model behind
/// the same trait.
pub struct KeywordClassifier {
    patterns: RegexSet,
}

impl KeywordClassifier {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = RegexSet::new(patterns)
            .map_err(|e| Error::InvalidConfig(format!("bad moderation pattern: {e}")))?;
        Ok(Self { patterns })
    }

    /// The default offline deny-list.
    pub fn unsafe_content() -> Result<Self> {
        Self::new([
            r"(?i)ignore\s+(all|any|previous|prior)\s+(instructions|prompts|rules)",
            r"(?i)(reveal|show|print)\s+.*system\s+prompt",
            r"(?i)jailbreak",
            r"(?i)disregard\s+.*(instructions|guidelines)",
            r"(?i)how\s+to\s+(make|build|synthesize)\s+(a\s+)?(bomb|explosive|nerve\s+agent)",
        ])
    }
}

impl Classifier for KeywordClassifier {
    fn flags(&self, text: &str) -> Result<bool> {
        let flagged = self.patterns.is_match(text);
        if flagged {
            debug!("keyword classifier flagged text");
        }
        Ok(flagged)
    }
}

/// Topical-relevance classifier built from the corpus vocabulary.
///
/// Flags (off-topic) a query that shares no content token with the indexed
/// chunks. Intentionally permissive: one overlapping token keeps a query in.
pub struct LexiconClassifier {
    lexicon: HashSet<String>,
}

impl LexiconClassifier {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let mut lexicon = HashSet::new();
        for chunk in chunks {
            lexicon.extend(content_tokens(&chunk.text));
            lexicon.extend(chunk.metadata.values().flat_map(|v| content_tokens(v)));
        }
        Self { lexicon }
    }
}

impl Classifier for LexiconClassifier {
    fn flags(&self, text: &str) -> Result<bool> {
        if self.lexicon.is_empty() {
            return Ok(false);
        }
        Ok(!content_tokens(text).any(|t| self.lexicon.contains(&t)))
    }
}

/// Extractive generator: answers with the best retrieved passage verbatim.
///
/// A stand-in for the production language model; with no context it returns
/// a fixed sentence that deliberately overlaps nothing, so the output guard
/// scores it down.
#[derive(Debug, Default)]
pub struct ExtractiveGenerator;

impl Generator for ExtractiveGenerator {
    fn generate(&self, prompt: &Prompt) -> Result<String> {
        match prompt.passages.first() {
            Some(passage) => Ok(passage.trim().to_string()),
            None => Ok("No relevant passages were found for that question.".to_string()),
        }
    }
}

/// Confidence as the fraction of answer content tokens grounded in the
/// retrieved context. An empty answer or empty context scores 0.
#[derive(Debug, Default)]
pub struct OverlapScorer;

impl ConfidenceScorer for OverlapScorer {
    fn score(&self, _question: &str, answer: &str, context: &[String]) -> Result<f32> {
        if context.is_empty() {
            return Ok(0.0);
        }
        let grounded: HashSet<String> =
            context.iter().flat_map(|passage| content_tokens(passage)).collect();
        let mut total = 0usize;
        let mut matched = 0usize;
        for token in content_tokens(answer) {
            total += 1;
            if grounded.contains(&token) {
                matched += 1;
            }
        }
        if total == 0 {
            return Ok(0.0);
        }
        Ok(matched as f32 / total as f32)
    }
}
