use thiserror::Error;

/// Failure taxonomy for the pipeline core.
///
/// Guard rejections and sparse retrieval results are *not* errors; they are
/// handled inside the pipeline. Only configuration problems (fatal at
/// startup), external model-call failures (fatal to one invocation) and
/// internal plumbing faults surface here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("External {service} call failed: {message}")]
    ExternalService { service: &'static str, message: String },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Wrap a model-call failure, keeping it distinct from guard verdicts.
    pub fn external(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::ExternalService { service, message: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
