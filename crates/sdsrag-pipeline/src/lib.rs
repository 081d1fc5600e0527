#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod generation;
pub mod pipeline;

pub use generation::GenerationStage;
pub use pipeline::GuardedPipeline;
