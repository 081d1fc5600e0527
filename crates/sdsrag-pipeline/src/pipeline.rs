//! The guarded orchestrator: a small state machine sequencing
//! input guard → retrieve → generate → output guard, with a rejected exit
//! from each guard stage.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, info_span};

use sdsrag_core::config::RetrievalConfig;
use sdsrag_core::traits::Retriever;
use sdsrag_core::types::{Chunk, GuardVerdict, PipelineResult};
use sdsrag_core::Result;
use sdsrag_guard::{InputGuard, OutputGuard};

use crate::generation::GenerationStage;

/// Stages of one pipeline invocation. Guard rejections and the final pass
/// exit the machine directly with a [`PipelineResult`].
enum Stage {
    InputGuard,
    Retrieve,
    Generate(Vec<Chunk>),
    OutputGuard { chunks: Vec<Chunk>, draft: String },
}

/// Synchronous, stateless-per-invocation question answering pipeline.
///
/// All members are read-only after construction, so one instance can be
/// shared across threads (`Arc<GuardedPipeline>`) and invoked concurrently.
/// No query-to-query memory lives here; session history belongs to the
/// caller.
pub struct GuardedPipeline {
    input_guard: InputGuard,
    retriever: Arc<dyn Retriever>,
    generation: GenerationStage,
    output_guard: OutputGuard,
    k: usize,
}

impl GuardedPipeline {
    pub fn new(
        input_guard: InputGuard,
        retriever: Arc<dyn Retriever>,
        generation: GenerationStage,
        output_guard: OutputGuard,
        retrieval: &RetrievalConfig,
    ) -> Result<Self> {
        retrieval.validate()?;
        Ok(Self { input_guard, retriever, generation, output_guard, k: retrieval.k })
    }

    /// Runs one query through the full machine, producing exactly one
    /// [`PipelineResult`].
    ///
    /// Guard rejections come back as `Ok` results with `guarded = true`;
    /// only external service failures (moderation, embedding, generation or
    /// scoring calls) are `Err`.
    pub fn invoke(&self, question: &str) -> Result<PipelineResult> {
        let span = info_span!("guarded_pipeline");
        let _entered = span.enter();

        let mut stage = Stage::InputGuard;
        loop {
            stage = match stage {
                Stage::InputGuard => match self.input_guard.check(question)? {
                    GuardVerdict::Reject { reason, message } => {
                        info!(reason = reason.code(), "input guard rejected query");
                        return Ok(PipelineResult::refusal(message));
                    }
                    GuardVerdict::Pass => Stage::Retrieve,
                },
                // Retrieval never fails the pipeline; an empty result set is
                // passed through as "no context".
                Stage::Retrieve => {
                    let chunks = self.retriever.retrieve(question, self.k)?;
                    debug!(retrieved = chunks.len(), "retrieval complete");
                    Stage::Generate(chunks)
                }
                Stage::Generate(chunks) => {
                    let draft = self.generation.generate(question, &chunks)?;
                    Stage::OutputGuard { chunks, draft }
                }
                Stage::OutputGuard { chunks, draft } => {
                    let context: Vec<String> =
                        chunks.iter().map(|chunk| chunk.text.clone()).collect();
                    match self.output_guard.check(question, &draft, &context)? {
                        GuardVerdict::Reject { reason, message } => {
                            info!(reason = reason.code(), "output guard rejected draft answer");
                            return Ok(PipelineResult::refusal(message));
                        }
                        GuardVerdict::Pass => {
                            let sources: BTreeSet<String> = chunks
                                .iter()
                                .map(|chunk| chunk.provenance().to_string())
                                .collect();
                            info!(sources = sources.len(), "answer produced");
                            return Ok(PipelineResult::answered(draft, sources));
                        }
                    }
                }
            };
        }
    }

    /// The minimal `{question} -> {answer}` contract for front-end callers.
    /// Sources and the `guarded` flag are available through [`invoke`].
    ///
    /// [`invoke`]: GuardedPipeline::invoke
    pub fn answer(&self, question: &str) -> Result<String> {
        Ok(self.invoke(question)?.answer)
    }
}
