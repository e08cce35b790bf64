//! Persistence contract consumed by the job processor and orchestrator.
//!
//! The core never implements this trait itself — a host application wires
//! up a concrete store (Postgres, sqlite, a test double) and hands it in.
//! Every method maps to one concern named in the job-processing pipeline.

use async_trait::async_trait;

use crate::error::ScriberrError;
use crate::job::{ExecutionRecord, Job, JobId, JobStatus, SpeakerMapping};
use crate::transcript::TranscriptResult;

/// A job together with the associations the processor needs in one trip:
/// its execution history and any speaker display-name mappings.
#[derive(Debug, Clone)]
pub struct JobWithAssociations {
    pub job: Job,
    pub executions: Vec<ExecutionRecord>,
    pub speaker_mappings: Vec<SpeakerMapping>,
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn find_with_associations(
        &self,
        job_id: &JobId,
    ) -> Result<Option<JobWithAssociations>, ScriberrError>;

    async fn create_job(&self, job: Job) -> Result<(), ScriberrError>;

    async fn update_transcript(
        &self,
        job_id: &JobId,
        transcript: &TranscriptResult,
    ) -> Result<(), ScriberrError>;

    /// Incrementally records one track's transcript during multi-track
    /// processing, keyed by track display name.
    async fn update_individual_transcript(
        &self,
        job_id: &JobId,
        track_name: &str,
        transcript: &TranscriptResult,
    ) -> Result<(), ScriberrError>;

    /// §4.6 step 1: clear any per-track transcripts left over from a prior
    /// attempt, so progress reporting starts at 0/N.
    async fn clear_individual_transcripts(&self, job_id: &JobId) -> Result<(), ScriberrError>;

    async fn update_status(&self, job_id: &JobId, status: JobStatus) -> Result<(), ScriberrError>;

    async fn update_error(&self, job_id: &JobId, message: &str) -> Result<(), ScriberrError>;

    async fn create_execution(&self, execution: &ExecutionRecord) -> Result<(), ScriberrError>;

    async fn update_execution(&self, execution: &ExecutionRecord) -> Result<(), ScriberrError>;

    async fn delete_executions_by_job_id(&self, job_id: &JobId) -> Result<(), ScriberrError>;

    async fn delete_multi_track_files_by_job_id(&self, job_id: &JobId) -> Result<(), ScriberrError>;

    async fn save_speaker_mapping(&self, mapping: SpeakerMapping) -> Result<(), ScriberrError>;
}
