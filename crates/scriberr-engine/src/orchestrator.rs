//! Multi-Track Orchestrator (§4.6): fans out one child job per track,
//! processes them strictly sequentially, and merges the results into one
//! chronologically-ordered, speaker-labeled transcript.
//!
//! `activeTrackJobs` generalizes the teacher's `retranscription_cancel`
//! single-slot `RwLock<Option<CancellationToken>>` (`state/mod.rs`) into a
//! map keyed by parent job id, since multiple multi-track jobs may be
//! in flight under one pool.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use scriberr_registry::ModelRegistry;
use scriberr_types::{
    Job, JobId, JobRepository, JobStatus, ScriberrError, SpeakerMapping, TrackTiming,
    TranscriptResult, WordSegment,
};

use crate::config::EngineConfig;
use crate::event_bus::{EventBus, JobEvent};
use crate::pipeline;

pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
    repository: Arc<dyn JobRepository>,
    events: Arc<EventBus>,
    config: EngineConfig,
    active_track_jobs: RwLock<HashMap<JobId, CancellationToken>>,
    termination_reasons: RwLock<HashMap<JobId, String>>,
}

/// Derive a track's display name from its filename: strip the extension,
/// replace `_`/`-` with spaces, and title-case each word.
pub fn derive_display_name(path: &std::path::Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("track");
    stem.chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        repository: Arc<dyn JobRepository>,
        events: Arc<EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            repository,
            events,
            config,
            active_track_jobs: RwLock::new(HashMap::new()),
            termination_reasons: RwLock::new(HashMap::new()),
        }
    }

    /// Cancel an in-flight multi-track job. No-op if `job_id` is not
    /// currently running. The actual job-status/error bookkeeping happens
    /// once back in `JobProcessor::process_job`'s single failure path, so
    /// there is only ever one write to the job's terminal status — this just
    /// records *why* it was cancelled for that path to pick up.
    pub async fn terminate(&self, job_id: &JobId) -> Result<(), ScriberrError> {
        let token = self.active_track_jobs.read().await.get(job_id).cloned();
        let Some(token) = token else {
            return Ok(());
        };
        self.termination_reasons
            .write()
            .await
            .insert(job_id.clone(), "Job was terminated by user".to_string());
        token.cancel();
        Ok(())
    }

    /// Consumed by `JobProcessor` after a multi-track run fails, to tell an
    /// explicit `terminate()` call apart from any other cancellation source.
    pub async fn take_termination_reason(&self, job_id: &JobId) -> Option<String> {
        self.termination_reasons.write().await.remove(job_id)
    }

    /// Run the full §4.6 algorithm for `parent_job`, which must have ≥2
    /// tracks. Returns the merged transcript and the per-track/merge timings
    /// to be folded into the parent's `ExecutionRecord`.
    pub async fn run_multi_track(
        &self,
        ctx: &CancellationToken,
        parent_job: &Job,
    ) -> Result<(TranscriptResult, Vec<TrackTiming>, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>), ScriberrError> {
        let parent_id = parent_job.id.clone();
        self.active_track_jobs
            .write()
            .await
            .insert(parent_id.clone(), ctx.clone());

        let result = self.run_multi_track_inner(ctx, parent_job).await;

        self.active_track_jobs.write().await.remove(&parent_id);
        result
    }

    async fn run_multi_track_inner(
        &self,
        ctx: &CancellationToken,
        parent_job: &Job,
    ) -> Result<(TranscriptResult, Vec<TrackTiming>, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>), ScriberrError> {
        self.repository.clear_individual_transcripts(&parent_job.id).await?;

        let mut per_track_words: Vec<(String, f64, Vec<WordSegment>)> = Vec::new();
        let mut timings = Vec::new();

        for (index, track) in parent_job.tracks.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(ScriberrError::Canceled);
            }

            let display_name = if track.display_name.is_empty() {
                derive_display_name(&track.path)
            } else {
                track.display_name.clone()
            };

            let child_id = format!("{}-track-{}", parent_job.id, index);
            let mut child_parameters = parent_job.parameters.clone();
            child_parameters.diarize = false;
            child_parameters.is_multi_track_enabled = false;

            let child_job = Job::new_single(child_id.clone(), track.path.clone(), child_parameters.clone());
            self.repository.create_job(child_job).await?;
            self.repository.update_status(&child_id, JobStatus::Processing).await?;

            let job_temp_dir = self.config.job_temp_directory(&child_id);
            let started_at = chrono::Utc::now();

            // Scoped cleanup: this child row is ephemeral and must not
            // outlive this iteration, on either the success or error path.
            let outcome = pipeline::run_single_track(
                &self.registry,
                &self.config,
                &job_temp_dir,
                &track.path,
                &child_parameters,
                true,
                ctx,
            )
            .await;

            self.repository.delete_executions_by_job_id(&child_id).await?;
            self.repository.delete_multi_track_files_by_job_id(&child_id).await?;

            let transcript = match outcome {
                Ok(t) => t,
                Err(e) => return Err(e),
            };

            let ended_at = chrono::Utc::now();
            timings.push(TrackTiming {
                track_name: display_name.clone(),
                start: started_at,
                end: ended_at,
                duration_ms: (ended_at - started_at).num_milliseconds(),
            });

            self.repository
                .update_individual_transcript(&parent_job.id, &display_name, &transcript)
                .await?;
            self.events.publish(JobEvent::TrackCompleted {
                job_id: parent_job.id.clone(),
                track_name: display_name.clone(),
                index,
                total: parent_job.tracks.len(),
            });

            let mut words = transcript.word_segments;
            for w in &mut words {
                w.speaker = Some(display_name.clone());
            }
            per_track_words.push((display_name, track.offset_seconds, words));
        }

        let merge_start = chrono::Utc::now();
        let merged = merge_tracks(&per_track_words);
        let merge_end = chrono::Utc::now();

        for (display_name, _, _) in &per_track_words {
            self.repository
                .save_speaker_mapping(SpeakerMapping {
                    job_id: parent_job.id.clone(),
                    original_label: display_name.clone(),
                    display_name: display_name.clone(),
                })
                .await?;
        }

        Ok((merged, timings, merge_start, merge_end))
    }
}

/// §4.6 step 5: apply each track's offset, concatenate, stable-sort by
/// `start`, then split into segments on every speaker change.
fn merge_tracks(per_track_words: &[(String, f64, Vec<WordSegment>)]) -> TranscriptResult {
    let mut words: Vec<WordSegment> = Vec::new();
    for (_, offset, track_words) in per_track_words {
        for w in track_words {
            words.push(WordSegment {
                start: w.start + offset,
                end: w.end + offset,
                word: w.word.clone(),
                score: w.score,
                speaker: w.speaker.clone(),
            });
        }
    }
    words.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    let mut segments = Vec::new();
    let mut current: Option<(f64, f64, Vec<String>, Option<String>)> = None;
    for w in &words {
        match &mut current {
            Some((_, end, texts, speaker)) if *speaker == w.speaker => {
                *end = w.end;
                texts.push(w.word.clone());
            }
            _ => {
                if let Some((start, end, texts, speaker)) = current.take() {
                    segments.push(scriberr_types::Segment {
                        start,
                        end,
                        text: texts.join(" "),
                        speaker,
                    });
                }
                current = Some((w.start, w.end, vec![w.word.clone()], w.speaker.clone()));
            }
        }
    }
    if let Some((start, end, texts, speaker)) = current {
        segments.push(scriberr_types::Segment {
            start,
            end,
            text: texts.join(" "),
            speaker,
        });
    }

    let mut result = TranscriptResult {
        segments,
        word_segments: words,
        language: None,
        text: String::new(),
    };
    result.rebuild_text();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn display_name_strips_extension_and_title_cases() {
        assert_eq!(derive_display_name(&PathBuf::from("alice_mic.wav")), "Alice Mic");
        assert_eq!(derive_display_name(&PathBuf::from("bob-sys-track.wav")), "Bob Sys Track");
        assert_eq!(derive_display_name(&PathBuf::from("SPEAKER.wav")), "Speaker");
    }

    #[test]
    fn merge_splits_on_speaker_change_only() {
        let a = vec![
            WordSegment { start: 0.0, end: 0.5, word: "hi".into(), score: None, speaker: Some("A".into()) },
            WordSegment { start: 1.0, end: 1.5, word: "there".into(), score: None, speaker: Some("A".into()) },
        ];
        let b = vec![
            WordSegment { start: 0.7, end: 0.9, word: "yo".into(), score: None, speaker: Some("B".into()) },
        ];
        let merged = merge_tracks(&[("A".into(), 0.0, a), ("B".into(), 0.0, b)]);
        assert_eq!(merged.segments.len(), 3);
        assert_eq!(merged.segments[0].speaker.as_deref(), Some("A"));
        assert_eq!(merged.segments[1].speaker.as_deref(), Some("B"));
        assert_eq!(merged.segments[2].speaker.as_deref(), Some("A"));
    }

    #[test]
    fn merge_applies_track_offsets_before_sorting() {
        let a = vec![WordSegment { start: 0.0, end: 0.2, word: "first".into(), score: None, speaker: Some("A".into()) }];
        let b = vec![WordSegment { start: 0.0, end: 0.2, word: "second".into(), score: None, speaker: Some("B".into()) }];
        // B's track is offset by -1s, so it should sort before A's word.
        let merged = merge_tracks(&[("A".into(), 0.0, a), ("B".into(), -1.0, b)]);
        assert_eq!(merged.word_segments[0].word, "second");
        assert_eq!(merged.word_segments[1].word, "first");
    }
}
