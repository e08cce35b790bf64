//! An in-memory [`JobRepository`] so the processor and orchestrator are
//! independently testable without a database — mirrors how the teacher keeps
//! ML engines behind a trait object (`TranscriptionEngine`) so Tauri commands
//! can be tested without real models.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use scriberr_types::{
    ExecutionRecord, Job, JobId, JobRepository, JobStatus, JobWithAssociations, ScriberrError,
    SpeakerMapping, TranscriptResult,
};

#[derive(Default)]
struct Store {
    jobs: HashMap<JobId, Job>,
    executions: HashMap<JobId, Vec<ExecutionRecord>>,
    speaker_mappings: HashMap<JobId, Vec<SpeakerMapping>>,
}

/// Test/embedding double for [`JobRepository`]. Not part of the core
/// contract — a host application wires up a real store instead.
#[derive(Default)]
pub struct InMemoryJobRepository {
    store: Mutex<Store>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/inspection helper: read back a job without going through the
    /// `JobRepository` trait's association-bundling shape.
    pub fn get_job(&self, job_id: &JobId) -> Option<Job> {
        self.store.lock().unwrap().jobs.get(job_id).cloned()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn find_with_associations(
        &self,
        job_id: &JobId,
    ) -> Result<Option<JobWithAssociations>, ScriberrError> {
        let store = self.store.lock().unwrap();
        Ok(store.jobs.get(job_id).map(|job| JobWithAssociations {
            job: job.clone(),
            executions: store.executions.get(job_id).cloned().unwrap_or_default(),
            speaker_mappings: store
                .speaker_mappings
                .get(job_id)
                .cloned()
                .unwrap_or_default(),
        }))
    }

    async fn create_job(&self, job: Job) -> Result<(), ScriberrError> {
        self.store.lock().unwrap().jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn update_transcript(
        &self,
        job_id: &JobId,
        transcript: &TranscriptResult,
    ) -> Result<(), ScriberrError> {
        let mut store = self.store.lock().unwrap();
        let job = store
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ScriberrError::RepositoryError(format!("unknown job {job_id}")))?;
        job.transcript = Some(serde_json::to_value(transcript)?);
        Ok(())
    }

    async fn update_individual_transcript(
        &self,
        job_id: &JobId,
        track_name: &str,
        transcript: &TranscriptResult,
    ) -> Result<(), ScriberrError> {
        let mut store = self.store.lock().unwrap();
        let job = store
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ScriberrError::RepositoryError(format!("unknown job {job_id}")))?;
        job.individual_transcripts
            .insert(track_name.to_string(), serde_json::to_value(transcript)?);
        Ok(())
    }

    async fn clear_individual_transcripts(&self, job_id: &JobId) -> Result<(), ScriberrError> {
        let mut store = self.store.lock().unwrap();
        let job = store
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ScriberrError::RepositoryError(format!("unknown job {job_id}")))?;
        job.individual_transcripts.clear();
        Ok(())
    }

    async fn update_status(&self, job_id: &JobId, status: JobStatus) -> Result<(), ScriberrError> {
        let mut store = self.store.lock().unwrap();
        let job = store
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ScriberrError::RepositoryError(format!("unknown job {job_id}")))?;
        job.status = status;
        Ok(())
    }

    async fn update_error(&self, job_id: &JobId, message: &str) -> Result<(), ScriberrError> {
        let mut store = self.store.lock().unwrap();
        let job = store
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ScriberrError::RepositoryError(format!("unknown job {job_id}")))?;
        job.error_message = Some(message.to_string());
        Ok(())
    }

    async fn create_execution(&self, execution: &ExecutionRecord) -> Result<(), ScriberrError> {
        self.store
            .lock()
            .unwrap()
            .executions
            .entry(execution.job_id.clone())
            .or_default()
            .push(execution.clone());
        Ok(())
    }

    async fn update_execution(&self, execution: &ExecutionRecord) -> Result<(), ScriberrError> {
        let mut store = self.store.lock().unwrap();
        let records = store.executions.entry(execution.job_id.clone()).or_default();
        match records.iter_mut().find(|r| r.id == execution.id) {
            Some(slot) => *slot = execution.clone(),
            None => records.push(execution.clone()),
        }
        Ok(())
    }

    async fn delete_executions_by_job_id(&self, job_id: &JobId) -> Result<(), ScriberrError> {
        self.store.lock().unwrap().executions.remove(job_id);
        Ok(())
    }

    async fn delete_multi_track_files_by_job_id(&self, job_id: &JobId) -> Result<(), ScriberrError> {
        let mut store = self.store.lock().unwrap();
        store.jobs.remove(job_id);
        store.executions.remove(job_id);
        store.speaker_mappings.remove(job_id);
        Ok(())
    }

    async fn save_speaker_mapping(&self, mapping: SpeakerMapping) -> Result<(), ScriberrError> {
        self.store
            .lock()
            .unwrap()
            .speaker_mappings
            .entry(mapping.job_id.clone())
            .or_default()
            .push(mapping);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriberr_types::Parameters;
    use std::path::PathBuf;

    #[tokio::test]
    async fn create_then_find_round_trips() {
        let repo = InMemoryJobRepository::new();
        let job = Job::new_single("job-1", PathBuf::from("/tmp/a.wav"), Parameters::default());
        repo.create_job(job.clone()).await.unwrap();

        let found = repo.find_with_associations(&"job-1".to_string()).await.unwrap();
        assert_eq!(found.unwrap().job.id, "job-1");
    }

    #[tokio::test]
    async fn delete_multi_track_files_removes_the_job_row() {
        let repo = InMemoryJobRepository::new();
        let job = Job::new_single("job-1", PathBuf::from("/tmp/a.wav"), Parameters::default());
        repo.create_job(job).await.unwrap();
        repo.delete_multi_track_files_by_job_id(&"job-1".to_string())
            .await
            .unwrap();

        assert!(repo
            .find_with_associations(&"job-1".to_string())
            .await
            .unwrap()
            .is_none());
    }
}
