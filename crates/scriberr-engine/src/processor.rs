//! Job Processor (§4.4): the single entry point `process_job(ctx, job_id)`.
//!
//! Steps: load job → open `ExecutionRecord` → branch multi-track/single-track
//! → preprocess/transcribe/diarize/fuse → persist → close `ExecutionRecord`
//! → broadcast `job_update` → fire webhook. Failure at any step closes the
//! execution record as `failed`, broadcasts the failure, and returns the
//! error — the queue, not this processor, decides whether to retry.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use scriberr_registry::ModelRegistry;
use scriberr_types::{ExecutionRecord, ExecutionStatus, JobId, JobRepository, JobStatus, ScriberrError};

use crate::config::EngineConfig;
use crate::event_bus::{EventBus, JobEvent};
use crate::orchestrator::Orchestrator;
use crate::pipeline;
use crate::webhook::{dispatch_webhook, WebhookMetadata, WebhookPayload};

pub struct JobProcessor {
    registry: Arc<ModelRegistry>,
    repository: Arc<dyn JobRepository>,
    events: Arc<EventBus>,
    orchestrator: Arc<Orchestrator>,
    config: EngineConfig,
}

impl JobProcessor {
    pub fn new(
        registry: Arc<ModelRegistry>,
        repository: Arc<dyn JobRepository>,
        events: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            repository.clone(),
            events.clone(),
            config.clone(),
        ));
        Self {
            registry,
            repository,
            events,
            orchestrator,
            config,
        }
    }

    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        self.orchestrator.clone()
    }

    /// §4.4's `processJob(ctx, jobId)`.
    pub async fn process_job(&self, ctx: CancellationToken, job_id: &JobId) -> Result<(), ScriberrError> {
        let with_assoc = self
            .repository
            .find_with_associations(job_id)
            .await?
            .ok_or_else(|| ScriberrError::RepositoryError(format!("job {job_id} not found")))?;
        let job = with_assoc.job;

        let mut execution = ExecutionRecord::start(job_id.clone(), job.parameters.clone());
        self.repository.create_execution(&execution).await?;
        self.repository.update_status(job_id, JobStatus::Processing).await?;
        self.events.publish(JobEvent::JobUpdate {
            job_id: job_id.clone(),
            status: "processing".into(),
            error: None,
        });

        let result = if job.is_multi_track() {
            self.orchestrator
                .run_multi_track(&ctx, &job)
                .await
                .map(|(transcript, timings, merge_start, merge_end)| {
                    execution.track_timings = timings;
                    execution.merge_start = Some(merge_start);
                    execution.merge_end = Some(merge_end);
                    execution.merge_duration_ms = Some((merge_end - merge_start).num_milliseconds());
                    transcript
                })
        } else {
            let audio_path = job
                .audio_path
                .clone()
                .ok_or_else(|| ScriberrError::RepositoryError("single-track job missing audio_path".into()))?;
            let job_temp_dir = self.config.job_temp_directory(job_id);
            pipeline::run_single_track(
                &self.registry,
                &self.config,
                &job_temp_dir,
                &audio_path,
                &job.parameters,
                false,
                &ctx,
            )
            .await
        };

        match result {
            Ok(transcript) => {
                if !job.is_multi_track() {
                    self.save_speaker_mappings(job_id, &transcript).await?;
                }
                self.repository.update_transcript(job_id, &transcript).await?;
                self.repository.update_status(job_id, JobStatus::Completed).await?;
                execution.complete(ExecutionStatus::Completed, None);
                self.repository.update_execution(&execution).await?;
                self.events.publish(JobEvent::JobUpdate {
                    job_id: job_id.clone(),
                    status: "completed".into(),
                    error: None,
                });

                if let Some(url) = &job.parameters.callback_url {
                    self.fire_webhook(url, job_id, &job, "completed", Some(&transcript), None, &execution);
                }
                Ok(())
            }
            Err(e) => {
                let message = if job.is_multi_track() {
                    self.orchestrator
                        .take_termination_reason(job_id)
                        .await
                        .unwrap_or_else(|| e.to_string())
                } else {
                    e.to_string()
                };
                self.repository.update_error(job_id, &message).await?;
                self.repository.update_status(job_id, JobStatus::Failed).await?;
                execution.complete(ExecutionStatus::Failed, Some(message.clone()));
                self.repository.update_execution(&execution).await?;
                self.events.publish(JobEvent::JobUpdate {
                    job_id: job_id.clone(),
                    status: "failed".into(),
                    error: Some(message.clone()),
                });

                if let Some(url) = &job.parameters.callback_url {
                    self.fire_webhook(url, job_id, &job, "failed", None, Some(&message), &execution);
                }
                Err(e)
            }
        }
    }

    /// §4.4 step 6: write one `SpeakerMapping` per distinct speaker label a
    /// single-track diarization/fusion pass produced. Multi-track jobs write
    /// their own mappings in the orchestrator, keyed by track display name.
    async fn save_speaker_mappings(
        &self,
        job_id: &JobId,
        transcript: &scriberr_types::TranscriptResult,
    ) -> Result<(), ScriberrError> {
        let mut seen = std::collections::BTreeSet::new();
        for segment in &transcript.segments {
            let Some(speaker) = &segment.speaker else { continue };
            if !seen.insert(speaker.clone()) {
                continue;
            }
            self.repository
                .save_speaker_mapping(scriberr_types::SpeakerMapping {
                    job_id: job_id.clone(),
                    original_label: speaker.clone(),
                    display_name: speaker.clone(),
                })
                .await?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn fire_webhook(
        &self,
        url: &str,
        job_id: &JobId,
        job: &scriberr_types::Job,
        status: &str,
        transcript: Option<&scriberr_types::TranscriptResult>,
        error_message: Option<&str>,
        execution: &ExecutionRecord,
    ) {
        let payload = WebhookPayload {
            job_id: job_id.clone(),
            status: status.to_string(),
            audio_path: job.audio_path.as_ref().map(|p| p.display().to_string()),
            transcript: transcript.and_then(|t| serde_json::to_value(t).ok()),
            summary: None,
            error_message: error_message.map(str::to_string),
            completed_at: chrono::Utc::now(),
            metadata: WebhookMetadata {
                model: job.parameters.model_id.clone(),
                model_family: job.parameters.model_family.clone(),
                duration_ms: execution.duration_ms.unwrap_or(0),
            },
        };
        dispatch_webhook(
            url.to_string(),
            payload,
            Duration::from_secs(self.config.webhook_timeout_secs),
        );
    }

    /// §4.6's cancellation surface, forwarded to the orchestrator.
    pub async fn terminate_multi_track_job(&self, job_id: &JobId) -> Result<(), ScriberrError> {
        self.orchestrator.terminate(job_id).await
    }
}
