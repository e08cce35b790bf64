//! Error taxonomy shared by every crate in the workspace.
//!
//! Mirrors the kinds named in the engine's error-handling design: each
//! variant is fatal to the job unless noted otherwise in its doc comment.

use thiserror::Error;

/// Errors produced anywhere in the job-processing pipeline.
#[derive(Debug, Error)]
pub enum ScriberrError {
    /// The requested model id is not registered. Fatal to the job.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// Caught at validation time, before any subprocess is launched.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameters { field: String, reason: String },

    /// Probe failed and the adapter could not fall back.
    #[error("audio unreadable: {0}")]
    AudioUnreadable(String),

    /// Recoverable when the original format is WAV/FLAC; otherwise fatal.
    #[error("preprocessing failed: {0}")]
    PreprocessFailed(String),

    /// The inference subprocess exited non-zero.
    #[error("adapter runtime error: {stderr}")]
    AdapterRuntime { stderr: String },

    /// `ctx` was cancelled.
    #[error("job was cancelled")]
    Canceled,

    /// Diarization-only failure after a transcription already succeeded.
    /// Non-fatal: callers should save the transcript without speaker
    /// attribution and log this as a warning, not fail the job.
    #[error("diarization failed: {0}")]
    DiarizationFailed(String),

    /// Database/storage failure surfaced through [`crate::JobRepository`].
    #[error("repository error: {0}")]
    RepositoryError(String),

    /// Webhook delivery failure. Logged; never affects job status.
    #[error("webhook error: {0}")]
    WebhookError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ScriberrError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error kind is safe to persist without a speaker-
    /// attribution transcript rollback (diarization-only failures).
    pub fn is_diarization_only(&self) -> bool {
        matches!(self, Self::DiarizationFailed(_))
    }
}
