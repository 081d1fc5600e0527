//! Domain types shared by the index, guard and pipeline crates.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// Metadata key every indexed chunk should carry for citation.
pub const PROVENANCE_KEY: &str = "product_name";

/// Placeholder provenance when a chunk is missing `product_name`.
pub const UNKNOWN_PROVENANCE: &str = "?";

/// A bounded span of source document text, the unit of retrieval.
///
/// Immutable once created. The [`crate::store::ChunkStore`] owns all chunks;
/// the indexes refer to them by `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub metadata: Meta,
    /// Present once the chunk has been embedded for vector indexing.
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Meta::new(), embedding: None }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// The provenance value used for citations, `"?"` when absent.
    pub fn provenance(&self) -> &str {
        self.metadata.get(PROVENANCE_KEY).map_or(UNKNOWN_PROVENANCE, String::as_str)
    }
}

/// Indicates which index produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Lexical,
    Vector,
}

/// A ranked per-query result referring to a chunk by id.
///
/// `score` is index-specific but higher is always better. `rank` is the
/// zero-based position within the producing index's result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub rank: usize,
    pub source: SourceKind,
}

/// The structured grounding prompt handed to the generation model.
///
/// Keeping the parts separate lets offline and test generators work with the
/// passages directly while production clients flatten it via [`render`].
///
/// [`render`]: Prompt::render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub instructions: String,
    pub question: String,
    /// Retrieved passage texts, best first; empty means "no context".
    pub passages: Vec<String>,
}

impl Prompt {
    /// Flatten to the single completion-request text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.instructions.len()
                + self.question.len()
                + self.passages.iter().map(String::len).sum::<usize>()
                + 64,
        );
        out.push_str(&self.instructions);
        out.push_str("\n\nContext:\n");
        if self.passages.is_empty() {
            out.push_str("(no relevant passages found)\n");
        } else {
            for passage in &self.passages {
                out.push_str("- ");
                out.push_str(passage);
                out.push('\n');
            }
        }
        out.push_str("\nQuestion: ");
        out.push_str(&self.question);
        out.push_str("\nAnswer:");
        out
    }
}

/// Why a guard rejected a query or a draft answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    TooShort,
    TooLong,
    UnsafeContent,
    OffTopic,
    LowConfidence,
}

impl RejectReason {
    /// Stable machine-readable code for logs and callers.
    pub fn code(self) -> &'static str {
        match self {
            Self::TooShort => "TOO_SHORT",
            Self::TooLong => "TOO_LONG",
            Self::UnsafeContent => "UNSAFE_CONTENT",
            Self::OffTopic => "OFF_TOPIC",
            Self::LowConfidence => "LOW_CONFIDENCE",
        }
    }

    /// Fixed user-facing refusal text. Callers match on the leading prefix,
    /// so the first words of each message must never change.
    pub fn message(self) -> &'static str {
        match self {
            Self::TooShort => "Input too short. Please ask a fuller question.",
            Self::TooLong => "Input too long. Please shorten your question and try again.",
            Self::UnsafeContent => {
                "Your query was flagged by the content safety check and cannot be processed. \
                 Please rephrase it."
            }
            Self::OffTopic => {
                "Your question doesn't appear to be about the safety data sheets in this \
                 corpus. Try asking about chemical hazards, handling or first aid measures."
            }
            Self::LowConfidence => {
                "I'm not confident enough in the retrieved information to answer that. \
                 Try rephrasing your question or naming the product explicitly."
            }
        }
    }
}

/// Outcome of a single guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Pass,
    Reject { reason: RejectReason, message: String },
}

impl GuardVerdict {
    pub fn reject(reason: RejectReason) -> Self {
        Self::Reject { reason, message: reason.message().to_string() }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// The terminal output of one pipeline invocation.
///
/// Invariant: `guarded == true` implies `sources` is empty. Citations are
/// attached only to genuinely generated answers that passed the output
/// guard, which is why construction goes through [`PipelineResult::refusal`]
/// and [`PipelineResult::answered`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub answer: String,
    pub sources: BTreeSet<String>,
    pub guarded: bool,
}

impl PipelineResult {
    pub fn refusal(message: impl Into<String>) -> Self {
        Self { answer: message.into(), sources: BTreeSet::new(), guarded: true }
    }

    pub fn answered(answer: impl Into<String>, sources: BTreeSet<String>) -> Self {
        Self { answer: answer.into(), sources, guarded: false }
    }
}

/// The fixed refusal prefixes, in the order legacy callers match them.
///
/// Compatibility shim for callers that post-process answers (e.g. append a
/// citation block) and decide by prefix instead of the `guarded` flag.
pub const GUARD_PREFIXES: [&str; 6] = [
    "Input too short",
    "Input too long",
    "Your query was flagged",
    "Your message was flagged",
    "Your question doesn't appear",
    "I'm not confident",
];

/// True when `answer` is a guard refusal rather than generated text.
pub fn is_guard_refusal(answer: &str) -> bool {
    GUARD_PREFIXES.iter().any(|p| answer.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_defaults_to_placeholder() {
        let chunk = Chunk::new("c1", "some text");
        assert_eq!(chunk.provenance(), "?");

        let chunk = chunk.with_metadata(PROVENANCE_KEY, "DESMOPHEN XP 2680");
        assert_eq!(chunk.provenance(), "DESMOPHEN XP 2680");
    }

    #[test]
    fn every_reason_message_starts_with_a_known_prefix() {
        let reasons = [
            RejectReason::TooShort,
            RejectReason::TooLong,
            RejectReason::UnsafeContent,
            RejectReason::OffTopic,
            RejectReason::LowConfidence,
        ];
        for reason in reasons {
            assert!(
                is_guard_refusal(reason.message()),
                "{} message must carry a stable prefix",
                reason.code()
            );
        }
    }

    #[test]
    fn refusal_results_never_carry_sources() {
        let result = PipelineResult::refusal(RejectReason::TooShort.message());
        assert!(result.guarded);
        assert!(result.sources.is_empty());
    }

    #[test]
    fn generated_text_is_not_mistaken_for_a_refusal() {
        assert!(!is_guard_refusal("Wear nitrile gloves and safety goggles."));
    }
}
