//! The adapter contract every transcription/diarization backend implements.
//!
//! Mirrors the teacher's `STTProvider`/`LLMProvider` split — one trait per
//! operation, `#[async_trait]`, registered as `Arc<dyn Trait>` — generalized
//! from "speech/chat provider" to "transcription/diarization adapter".

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use scriberr_types::{AudioInput, DiarizationResult, ScriberrError, TranscriptResult};

use crate::capability::{Capabilities, ParameterSpec};

/// Ambient, per-call context threaded through every adapter invocation:
/// a cancellation signal and a scratch directory the adapter owns for the
/// duration of the call.
#[derive(Clone)]
pub struct ProcContext {
    pub cancel: tokio_util::sync::CancellationToken,
    pub temp_directory: PathBuf,
}

impl ProcContext {
    pub fn new(temp_directory: PathBuf) -> Self {
        Self {
            cancel: tokio_util::sync::CancellationToken::new(),
            temp_directory,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub type ParameterMap = HashMap<String, Value>;

#[async_trait]
pub trait TranscriptionAdapter: Send + Sync {
    fn id(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    fn parameter_schema(&self) -> Vec<ParameterSpec>;

    /// Idempotent, possibly slow (model download, subprocess pool warmup).
    /// Called once per adapter during registry startup.
    async fn prepare_environment(&self) -> Result<(), ScriberrError>;

    /// Non-blocking liveness check.
    async fn is_ready(&self) -> bool;

    async fn transcribe(
        &self,
        audio: &AudioInput,
        params: &ParameterMap,
        ctx: &ProcContext,
    ) -> Result<TranscriptResult, ScriberrError>;
}

#[async_trait]
pub trait DiarizationAdapter: Send + Sync {
    fn id(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    fn parameter_schema(&self) -> Vec<ParameterSpec>;

    async fn prepare_environment(&self) -> Result<(), ScriberrError>;

    async fn is_ready(&self) -> bool;

    async fn diarize(
        &self,
        audio: &AudioInput,
        params: &ParameterMap,
        ctx: &ProcContext,
    ) -> Result<DiarizationResult, ScriberrError>;
}
