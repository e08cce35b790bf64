//! Job, Parameters, ExecutionRecord, SpeakerMapping, AudioInput.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque job identifier. Multi-track child jobs are prefixed with the
/// parent id (see the orchestrator), so this stays a plain string rather
/// than a typed UUID wrapper.
pub type JobId = String;

/// One track of a multi-track recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackFile {
    pub path: PathBuf,
    pub display_name: String,
    #[serde(default)]
    pub offset_seconds: f64,
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Flat parameter record naming the model family, model, and knobs.
///
/// Model-specific fields are optional; an adapter that does not consume a
/// given knob simply ignores it. Validity is governed by the registered
/// adapter's `parameter_schema()`, not by this struct's shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub model_family: String,
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default)]
    pub diarize: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diarization_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speakers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_speakers: Option<u32>,

    #[serde(default)]
    pub is_multi_track_enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vad_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_speech_duration_ms: Option<u64>,

    /// Parakeet long-form attention-context window, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attention_context: Option<u32>,
    /// Canary translation target language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    /// OpenAI cloud adapter API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    /// Voxtral local adapter token budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voxtral_token_budget: Option<u32>,

    #[serde(default)]
    pub auto_convert_audio: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,

    /// Adapter-specific knobs not modeled above, validated generically by
    /// the registry's `parameter_schema()` lookup.
    #[serde(default, flatten)]
    pub extra: std::collections::BTreeMap<String, serde_json::Value>,
}

impl Parameters {
    /// §3 invariant: diarize and multi-track are mutually exclusive.
    pub fn is_consistent(&self) -> bool {
        !(self.diarize && self.is_multi_track_enabled)
    }
}

/// A single job: either one audio file or a set of time-aligned tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracks: Vec<TrackFile>,
    pub parameters: Parameters,
    pub status: JobStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub individual_transcripts: std::collections::BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    pub fn is_multi_track(&self) -> bool {
        self.tracks.len() >= 2
    }

    pub fn new_single(id: impl Into<String>, audio_path: PathBuf, parameters: Parameters) -> Self {
        Self {
            id: id.into(),
            audio_path: Some(audio_path),
            tracks: Vec::new(),
            parameters,
            status: JobStatus::Pending,
            transcript: None,
            individual_transcripts: Default::default(),
            error_message: None,
        }
    }

    pub fn new_multi_track(id: impl Into<String>, tracks: Vec<TrackFile>, parameters: Parameters) -> Self {
        Self {
            id: id.into(),
            audio_path: None,
            tracks,
            parameters,
            status: JobStatus::Pending,
            transcript: None,
            individual_transcripts: Default::default(),
            error_message: None,
        }
    }
}

/// Per-track timing recorded by the multi-track orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackTiming {
    pub track_name: String,
    pub start: chrono::DateTime<chrono::Utc>,
    pub end: chrono::DateTime<chrono::Utc>,
    pub duration_ms: i64,
}

/// Execution attempt status, distinct from [`JobStatus`] because a job can
/// be reprocessed (a new attempt/`ExecutionRecord`) after failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Processing,
    Completed,
    Failed,
}

/// One processing attempt of one job. Append-only once `completed_at` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub job_id: JobId,
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    pub parameters: Parameters,
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub track_timings: Vec<TrackTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_start: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_end: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_duration_ms: Option<i64>,
}

impl ExecutionRecord {
    pub fn start(job_id: JobId, parameters: Parameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            started_at: chrono::Utc::now(),
            completed_at: None,
            duration_ms: None,
            parameters,
            status: ExecutionStatus::Processing,
            error_message: None,
            track_timings: Vec::new(),
            merge_start: None,
            merge_end: None,
            merge_duration_ms: None,
        }
    }

    /// Close the record. Panics if already closed — callers own the
    /// "append-only once completed" invariant and must not call this twice.
    pub fn complete(&mut self, status: ExecutionStatus, error_message: Option<String>) {
        assert!(self.completed_at.is_none(), "ExecutionRecord already closed");
        let now = chrono::Utc::now();
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.completed_at = Some(now);
        self.status = status;
        self.error_message = error_message;
    }
}

/// `{jobId, originalLabel, displayName}` — created when diarization or
/// multi-track assigns per-speaker labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerMapping {
    pub job_id: JobId,
    pub original_label: String,
    pub display_name: String,
}

/// In-memory description of an audio file, derived by the preprocessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInput {
    pub path: PathBuf,
    pub format: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub size_bytes: u64,
    /// Set iff a conversion was produced; must be released by the Job
    /// Processor on every exit path.
    pub temp_path: Option<PathBuf>,
}

impl AudioInput {
    /// The path adapters should actually read: the converted temp file if
    /// one was produced, otherwise the original.
    pub fn effective_path(&self) -> &std::path::Path {
        self.temp_path.as_deref().unwrap_or(&self.path)
    }

    pub fn is_pcm16_mono_16k(&self) -> bool {
        self.sample_rate == 16_000 && self.channel_count == 1 && self.format == "pcm_s16le"
    }
}
