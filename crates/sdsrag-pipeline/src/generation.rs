//! Generation stage: grounds the model in retrieved passages and invokes it
//! once per query. Returns raw answer text; citations are attached by the
//! orchestrator, never here.

use std::sync::Arc;

use tracing::debug;

use sdsrag_core::traits::Generator;
use sdsrag_core::types::{Chunk, Prompt};
use sdsrag_core::Result;

const INSTRUCTIONS: &str = "You are an assistant answering questions about chemical safety \
data sheets. Answer using only the provided context passages. If the context does not \
contain the answer, say that the information is not available in the documents.";

pub struct GenerationStage {
    generator: Arc<dyn Generator>,
}

impl GenerationStage {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// One model call. An empty `chunks` slice is passed through as "no
    /// context"; the model is still invoked and the output guard decides
    /// whether the result is usable.
    pub fn generate(&self, question: &str, chunks: &[Chunk]) -> Result<String> {
        let prompt = Prompt {
            instructions: INSTRUCTIONS.to_string(),
            question: question.to_string(),
            passages: chunks
                .iter()
                .map(|chunk| format!("[{}] {}", chunk.provenance(), chunk.text))
                .collect(),
        };
        debug!(passages = prompt.passages.len(), "invoking generation model");
        self.generator.generate(&prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdsrag_core::types::PROVENANCE_KEY;

    struct EchoGenerator;
    impl Generator for EchoGenerator {
        fn generate(&self, prompt: &Prompt) -> Result<String> {
            Ok(prompt.render())
        }
    }

    #[test]
    fn prompt_carries_passages_with_provenance_and_question() {
        let stage = GenerationStage::new(Arc::new(EchoGenerator));
        let chunks = vec![Chunk::new("c1", "Wear nitrile gloves.")
            .with_metadata(PROVENANCE_KEY, "DESMOPHEN XP 2680")];
        let rendered = stage.generate("What PPE is required?", &chunks).expect("generate");
        assert!(rendered.contains("[DESMOPHEN XP 2680] Wear nitrile gloves."));
        assert!(rendered.contains("Question: What PPE is required?"));
    }

    #[test]
    fn empty_retrieval_renders_a_no_context_prompt() {
        let stage = GenerationStage::new(Arc::new(EchoGenerator));
        let rendered = stage.generate("Anything?", &[]).expect("generate");
        assert!(rendered.contains("(no relevant passages found)"));
    }
}
