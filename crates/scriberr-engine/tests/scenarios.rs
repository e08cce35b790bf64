//! Processor-level integration tests for the six scenarios the job
//! processor and multi-track orchestrator are expected to handle, run
//! against fake adapters and the in-memory repository. No real inference
//! backend is invoked.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use scriberr_engine::{EngineConfig, EventBus, InMemoryJobRepository, JobProcessor, Orchestrator};
use scriberr_registry::adapter::{DiarizationAdapter, ProcContext, TranscriptionAdapter};
use scriberr_registry::capability::{Capabilities, Features, ParameterSpec, QualityTier};
use scriberr_registry::ModelRegistry;
use scriberr_types::{
    DiarizationResult, DiarizationSegment, Job, JobRepository, JobStatus, Parameters, ScriberrError,
    Segment, TrackFile, TranscriptResult, WordSegment,
};

fn write_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (sample_rate as f32 * seconds) as u32;
    for i in 0..n {
        let sample = ((i as f32 * 0.05).sin() * 2000.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// A transcription adapter with a canned response per audio path, used in
/// place of a real inference backend.
struct CannedTranscriber {
    id: String,
    only_language: Option<String>,
    by_path: HashMap<PathBuf, TranscriptResult>,
    /// When set, this adapter terminates the named job through the real
    /// orchestrator right after producing its response — used to simulate
    /// an operator cancelling a multi-track run mid-flight without relying
    /// on a race between two tasks.
    terminate_via: Option<(Arc<Orchestrator>, String)>,
}

impl CannedTranscriber {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            only_language: None,
            by_path: HashMap::new(),
            terminate_via: None,
        }
    }

    fn with_response(mut self, path: PathBuf, result: TranscriptResult) -> Self {
        self.by_path.insert(path, result);
        self
    }

    fn only_language(mut self, lang: &str) -> Self {
        self.only_language = Some(lang.to_string());
        self
    }

    fn terminate_after_first_call(mut self, orchestrator: Arc<Orchestrator>, job_id: String) -> Self {
        self.terminate_via = Some((orchestrator, job_id));
        self
    }
}

#[async_trait]
impl TranscriptionAdapter for CannedTranscriber {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: self.id.clone(),
            model_family: "fake".into(),
            display_name: self.id.clone(),
            supported_languages: self.only_language.clone().into_iter().collect(),
            supported_formats: vec!["wav".into()],
            features: Features {
                timestamps: true,
                ..Default::default()
            },
            quality_tier: QualityTier::Standard,
            memory_mb: 0,
            requires_gpu: false,
            // Mirrors the local adapters (whisper/parakeet/canary/...), which
            // all require the preprocessor's converted 16 kHz mono PCM16 wav.
            requires_pcm16_mono_16k: true,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    async fn prepare_environment(&self) -> Result<(), ScriberrError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        audio: &scriberr_types::AudioInput,
        params: &HashMap<String, serde_json::Value>,
        ctx: &ProcContext,
    ) -> Result<TranscriptResult, ScriberrError> {
        if let Some(required) = &self.only_language {
            if let Some(requested) = params.get("language").and_then(|v| v.as_str()) {
                if requested != required {
                    return Err(ScriberrError::invalid(
                        "language",
                        format!("{requested} is not supported by {}", self.id),
                    ));
                }
            }
        }

        if !audio.path.exists() {
            return Err(ScriberrError::AudioUnreadable(format!(
                "{} does not exist",
                audio.path.display()
            )));
        }

        let result = self
            .by_path
            .get(&audio.path)
            .cloned()
            .ok_or_else(|| ScriberrError::AudioUnreadable("no canned response for this path".into()))?;

        if let Some((orchestrator, job_id)) = &self.terminate_via {
            orchestrator.terminate(job_id).await.unwrap();
        }
        let _ = ctx;
        Ok(result)
    }
}

struct CannedDiarizer {
    segments: Vec<DiarizationSegment>,
}

#[async_trait]
impl DiarizationAdapter for CannedDiarizer {
    fn id(&self) -> &str {
        "fake-diarizer"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: "fake-diarizer".into(),
            model_family: "fake".into(),
            display_name: "fake-diarizer".into(),
            supported_languages: Vec::new(),
            supported_formats: vec!["wav".into()],
            features: Features::default(),
            quality_tier: QualityTier::Standard,
            memory_mb: 0,
            requires_gpu: false,
            requires_pcm16_mono_16k: false,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    async fn prepare_environment(&self) -> Result<(), ScriberrError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn diarize(
        &self,
        _audio: &scriberr_types::AudioInput,
        _params: &HashMap<String, serde_json::Value>,
        _ctx: &ProcContext,
    ) -> Result<DiarizationResult, ScriberrError> {
        Ok(DiarizationResult {
            segments: self.segments.clone(),
            speakers: vec!["SPEAKER_00".into()],
        })
    }
}

fn word(start: f64, end: f64, text: &str) -> WordSegment {
    WordSegment {
        start,
        end,
        word: text.to_string(),
        score: None,
        speaker: None,
    }
}

fn engine_config(temp_root: &Path) -> EngineConfig {
    EngineConfig {
        temp_directory: temp_root.to_path_buf(),
        max_concurrent_jobs: 2,
        probe_binary: PathBuf::from("this-binary-does-not-exist-anywhere"),
        webhook_timeout_secs: 5,
    }
}

/// Scenario 1: a single English job against a Whisper-like adapter with no
/// diarization. The source file is 48kHz stereo, so the preprocessor must
/// convert it before transcription, and clean the temp file up afterward.
#[tokio::test]
async fn single_track_english_job_completes_and_cleans_up_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let audio_path = dir.path().join("interview.wav");
    write_wav(&audio_path, 48_000, 2, 0.2);

    let transcript = TranscriptResult {
        segments: vec![Segment {
            start: 0.0,
            end: 1.0,
            text: "Hello world".into(),
            speaker: None,
        }],
        word_segments: vec![word(0.0, 0.5, "Hello"), word(0.5, 1.0, "world")],
        language: Some("en".into()),
        text: "Hello world".into(),
    };

    let registry = Arc::new(ModelRegistry::new());
    registry
        .register_transcription(Arc::new(
            CannedTranscriber::new("whisper-base").with_response(audio_path.clone(), transcript),
        ))
        .await;

    let repository = Arc::new(InMemoryJobRepository::new());
    let events = Arc::new(EventBus::new());
    let config = engine_config(dir.path());
    let processor = JobProcessor::new(registry, repository.clone(), events, config);

    let mut parameters = Parameters::default();
    parameters.model_family = "whisper".into();
    parameters.model_id = "whisper-base".into();
    parameters.language = Some("en".into());

    let job_id = "job-1".to_string();
    let job = Job::new_single(job_id.clone(), audio_path, parameters);
    repository.create_job(job).await.unwrap();

    processor
        .process_job(CancellationToken::new(), &job_id)
        .await
        .unwrap();

    let stored = repository.get_job(&job_id).unwrap();
    assert_eq!(stored.status, JobStatus::Completed);
    let transcript: TranscriptResult = serde_json::from_value(stored.transcript.unwrap()).unwrap();
    assert_eq!(transcript.text, "Hello world");

    let job_temp_dir = dir.path().join(&job_id);
    if job_temp_dir.exists() {
        let remaining: Vec<_> = std::fs::read_dir(&job_temp_dir).unwrap().collect();
        assert!(remaining.is_empty(), "job temp dir should be cleaned up");
    }
}

/// Scenario 2: diarization is on. Words get a speaker label and consecutive
/// fused segments never share a speaker.
#[tokio::test]
async fn diarization_produces_speaker_attributed_segments() {
    let dir = tempfile::tempdir().unwrap();
    let audio_path = dir.path().join("meeting.wav");
    write_wav(&audio_path, 16_000, 1, 0.1);

    let words: Vec<WordSegment> = (0..10)
        .map(|i| word(i as f64, i as f64 + 0.4, "word"))
        .collect();
    let transcript = TranscriptResult {
        segments: vec![Segment {
            start: 0.0,
            end: 9.4,
            text: "word word word word word word word word word word".into(),
            speaker: None,
        }],
        word_segments: words,
        language: Some("en".into()),
        text: "word word word word word word word word word word".into(),
    };

    let registry = Arc::new(ModelRegistry::new());
    registry
        .register_transcription(Arc::new(
            CannedTranscriber::new("whisper-base").with_response(audio_path.clone(), transcript),
        ))
        .await;
    registry
        .register_diarization(Arc::new(CannedDiarizer {
            segments: vec![DiarizationSegment {
                start: 0.3,
                end: 10.3,
                speaker: "SPEAKER_00".into(),
                confidence: None,
            }],
        }))
        .await;

    let repository = Arc::new(InMemoryJobRepository::new());
    let events = Arc::new(EventBus::new());
    let config = engine_config(dir.path());
    let processor = JobProcessor::new(registry, repository.clone(), events, config);

    let mut parameters = Parameters::default();
    parameters.model_family = "whisper".into();
    parameters.model_id = "whisper-base".into();
    parameters.diarize = true;
    parameters.diarization_model_id = Some("fake-diarizer".into());

    let job_id = "job-2".to_string();
    let job = Job::new_single(job_id.clone(), audio_path, parameters);
    repository.create_job(job).await.unwrap();

    processor
        .process_job(CancellationToken::new(), &job_id)
        .await
        .unwrap();

    let with_assoc = repository
        .find_with_associations(&job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(with_assoc.job.status, JobStatus::Completed);
    let transcript: TranscriptResult =
        serde_json::from_value(with_assoc.job.transcript.unwrap()).unwrap();
    assert!(transcript.segments.iter().any(|s| s.speaker.is_some()));
    for pair in transcript.segments.windows(2) {
        assert_ne!(pair[0].speaker, pair[1].speaker);
    }
    assert_eq!(with_assoc.speaker_mappings.len(), 1);
    assert_eq!(with_assoc.speaker_mappings[0].original_label, "SPEAKER_00");
}

/// Scenario 3: a two-track interview, alternating speakers A/B/A/B, merges
/// into exactly four segments that split only on speaker change (no
/// silence-gap rule, unlike single-track fusion).
#[tokio::test]
async fn multi_track_interview_merges_into_four_alternating_segments() {
    let dir = tempfile::tempdir().unwrap();
    let track_a = dir.path().join("alice_mic.wav");
    let track_b = dir.path().join("bob_mic.wav");
    write_wav(&track_a, 16_000, 1, 0.1);
    write_wav(&track_b, 16_000, 1, 0.1);

    let transcript_a = TranscriptResult {
        segments: vec![],
        word_segments: vec![word(0.0, 2.0, "a1"), word(10.0, 12.0, "a2")],
        language: Some("en".into()),
        text: String::new(),
    };
    let transcript_b = TranscriptResult {
        segments: vec![],
        word_segments: vec![word(5.0, 7.0, "b1"), word(15.0, 17.0, "b2")],
        language: Some("en".into()),
        text: String::new(),
    };

    let registry = Arc::new(ModelRegistry::new());
    registry
        .register_transcription(Arc::new(
            CannedTranscriber::new("whisper-base")
                .with_response(track_a.clone(), transcript_a)
                .with_response(track_b.clone(), transcript_b),
        ))
        .await;

    let repository = Arc::new(InMemoryJobRepository::new());
    let events = Arc::new(EventBus::new());
    let config = engine_config(dir.path());
    let processor = JobProcessor::new(registry, repository.clone(), events, config);

    let mut parameters = Parameters::default();
    parameters.model_family = "whisper".into();
    parameters.model_id = "whisper-base".into();
    parameters.is_multi_track_enabled = true;

    let job_id = "job-3".to_string();
    let tracks = vec![
        TrackFile {
            path: track_a,
            display_name: String::new(),
            offset_seconds: 0.0,
        },
        TrackFile {
            path: track_b,
            display_name: String::new(),
            offset_seconds: 0.0,
        },
    ];
    let job = Job::new_multi_track(job_id.clone(), tracks, parameters);
    repository.create_job(job).await.unwrap();

    processor
        .process_job(CancellationToken::new(), &job_id)
        .await
        .unwrap();

    let with_assoc = repository
        .find_with_associations(&job_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(with_assoc.job.status, JobStatus::Completed);
    assert_eq!(with_assoc.job.individual_transcripts.len(), 2);
    assert_eq!(with_assoc.speaker_mappings.len(), 2);

    let merged: TranscriptResult =
        serde_json::from_value(with_assoc.job.transcript.unwrap()).unwrap();
    assert_eq!(merged.segments.len(), 4);
    assert_eq!(merged.segments[0].speaker.as_deref(), Some("Alice Mic"));
    assert_eq!(merged.segments[1].speaker.as_deref(), Some("Bob Mic"));
    assert_eq!(merged.segments[2].speaker.as_deref(), Some("Alice Mic"));
    assert_eq!(merged.segments[3].speaker.as_deref(), Some("Bob Mic"));
}

/// Scenario 4: explicit termination mid-run. The track in flight finishes,
/// but the next one is never started, and the parent job is failed with the
/// termination message rather than the generic cancellation one.
#[tokio::test]
async fn explicit_termination_stops_before_the_next_track() {
    let dir = tempfile::tempdir().unwrap();
    let track_a = dir.path().join("a.wav");
    let track_b = dir.path().join("b.wav");
    let track_c = dir.path().join("c.wav");
    write_wav(&track_a, 16_000, 1, 0.05);
    write_wav(&track_b, 16_000, 1, 0.05);
    write_wav(&track_c, 16_000, 1, 0.05);

    let empty = || TranscriptResult {
        segments: vec![],
        word_segments: vec![word(0.0, 1.0, "x")],
        language: Some("en".into()),
        text: String::new(),
    };

    let repository = Arc::new(InMemoryJobRepository::new());
    let events = Arc::new(EventBus::new());
    let config = engine_config(dir.path());

    let registry = Arc::new(ModelRegistry::new());
    let processor = JobProcessor::new(registry.clone(), repository.clone(), events, config);
    let job_id = "job-4".to_string();

    // Track "a"'s response itself calls the real orchestrator's `terminate`,
    // simulating an operator cancelling the job as soon as the first track
    // finishes, deterministically rather than racing a watcher task against
    // the processing loop.
    registry
        .register_transcription(Arc::new(
            CannedTranscriber::new("whisper-base")
                .with_response(track_a.clone(), empty())
                .with_response(track_b.clone(), empty())
                .with_response(track_c.clone(), empty())
                .terminate_after_first_call(processor.orchestrator(), job_id.clone()),
        ))
        .await;

    let mut parameters = Parameters::default();
    parameters.model_family = "whisper".into();
    parameters.model_id = "whisper-base".into();
    parameters.is_multi_track_enabled = true;

    let tracks = vec![
        TrackFile { path: track_a, display_name: "a".into(), offset_seconds: 0.0 },
        TrackFile { path: track_b, display_name: "b".into(), offset_seconds: 0.0 },
        TrackFile { path: track_c, display_name: "c".into(), offset_seconds: 0.0 },
    ];
    let job = Job::new_multi_track(job_id.clone(), tracks, parameters);
    repository.create_job(job).await.unwrap();

    let result = processor.process_job(CancellationToken::new(), &job_id).await;
    assert!(result.is_err());

    let stored = repository.get_job(&job_id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("Job was terminated by user"));
    // Only track "a" ever got far enough to report completion.
    assert_eq!(stored.individual_transcripts.len(), 1);
}

/// Scenario 5: a job whose requested language the selected adapter does not
/// support is rejected before any further work happens.
#[tokio::test]
async fn unsupported_language_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let audio_path = dir.path().join("french.wav");
    write_wav(&audio_path, 16_000, 1, 0.05);

    let registry = Arc::new(ModelRegistry::new());
    registry
        .register_transcription(Arc::new(
            CannedTranscriber::new("parakeet")
                .only_language("en")
                .with_response(audio_path.clone(), TranscriptResult::default()),
        ))
        .await;

    let repository = Arc::new(InMemoryJobRepository::new());
    let events = Arc::new(EventBus::new());
    let config = engine_config(dir.path());
    let processor = JobProcessor::new(registry, repository.clone(), events, config);

    let mut parameters = Parameters::default();
    parameters.model_family = "parakeet".into();
    parameters.model_id = "parakeet".into();
    parameters.language = Some("fr".into());

    let job_id = "job-5".to_string();
    let job = Job::new_single(job_id.clone(), audio_path, parameters);
    repository.create_job(job).await.unwrap();

    let result = processor.process_job(CancellationToken::new(), &job_id).await;
    assert!(result.is_err());

    let stored = repository.get_job(&job_id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.error_message.unwrap().contains("fr"));
}

/// Scenario 6: the audio file is missing. The job fails with `AudioUnreadable`
/// and the failure webhook is still delivered.
#[tokio::test]
async fn missing_audio_file_fails_the_job_and_still_fires_the_webhook() {
    let dir = tempfile::tempdir().unwrap();
    let audio_path = dir.path().join("does-not-exist.wav");

    let registry = Arc::new(ModelRegistry::new());
    registry
        .register_transcription(Arc::new(CannedTranscriber::new("whisper-base")))
        .await;

    let repository = Arc::new(InMemoryJobRepository::new());
    let events = Arc::new(EventBus::new());
    let config = engine_config(dir.path());
    let processor = JobProcessor::new(registry, repository.clone(), events, config);

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/webhook")
        .match_header("content-type", "application/json")
        .with_status(200)
        .create_async()
        .await;

    let mut parameters = Parameters::default();
    parameters.model_family = "whisper".into();
    parameters.model_id = "whisper-base".into();
    parameters.callback_url = Some(format!("{}/webhook", server.url()));

    let job_id = "job-6".to_string();
    let job = Job::new_single(job_id.clone(), audio_path, parameters);
    repository.create_job(job).await.unwrap();

    let result = processor.process_job(CancellationToken::new(), &job_id).await;
    assert!(result.is_err());

    let stored = repository.get_job(&job_id).unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert!(stored.error_message.unwrap().contains("does not exist"));

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    mock.assert_async().await;
}
