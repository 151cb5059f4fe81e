//! Two error planes: fatal pipeline errors vs. per-chunk transcription
//! failures.
//!
//! `PipelineError` covers the three conditions that abort `process()` before
//! or during a run (configuration, input I/O, model load) plus deadline
//! expiry, which is not fatal but does need a typed marker so callers can
//! tell it apart from a genuine failure. Per-chunk ASR failures are never
//! represented here — they are recorded as data on `ChunkResult` (see
//! `domain::types::ChunkStatus`), never raised.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("input I/O error: {0}")]
    Io(String),

    #[error("model load error: {0}")]
    ModelLoad(String),

    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),
}

impl PipelineError {
    /// Exit code per the CLI surface in the external interfaces section.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 1,
            PipelineError::Io(_) => 2,
            PipelineError::ModelLoad(_) => 3,
            PipelineError::DeadlineExceeded(_) => 0,
        }
    }
}
