//! NVIDIA Parakeet long-form English ASR adapter. Local subprocess.

use std::path::PathBuf;

use async_trait::async_trait;
use scriberr_registry::{
    adapter::{ParameterMap, ProcContext, TranscriptionAdapter},
    capability::{Capabilities, Features, ParameterSpec, ParameterType, QualityTier},
};
use scriberr_types::{AudioInput, ScriberrError, Segment, TranscriptResult, WordSegment};
use scriberr_worker::{run_json, SubprocessRequest};
use serde::Deserialize;

use crate::common::{get_bool, get_u32, map_subprocess_error, reject_unsupported_language};

pub struct ParakeetAdapter {
    binary_path: PathBuf,
}

impl ParakeetAdapter {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[derive(Debug, Deserialize)]
struct ParakeetOutput {
    text: String,
    #[serde(default)]
    words: Vec<ParakeetWord>,
}

#[derive(Debug, Deserialize)]
struct ParakeetWord {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
}

#[async_trait]
impl TranscriptionAdapter for ParakeetAdapter {
    fn id(&self) -> &str {
        "parakeet"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: "parakeet".into(),
            model_family: "parakeet".into(),
            display_name: "NVIDIA Parakeet".into(),
            supported_languages: vec!["en".into()],
            supported_formats: vec!["wav".into()],
            features: Features {
                timestamps: true,
                translation: false,
                diarization: false,
                longform: true,
            },
            quality_tier: QualityTier::High,
            memory_mb: 2500,
            requires_gpu: true,
            requires_pcm16_mono_16k: true,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec {
            name: "attention_context".into(),
            kind: ParameterType::Integer,
            required: false,
            default: Some(serde_json::json!(30)),
            options: None,
            min: Some(1.0),
            max: Some(300.0),
            description: "Long-form attention context window in seconds".into(),
        }]
    }

    async fn prepare_environment(&self) -> Result<(), ScriberrError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.binary_path.exists()
    }

    async fn transcribe(
        &self,
        audio: &AudioInput,
        params: &ParameterMap,
        ctx: &ProcContext,
    ) -> Result<TranscriptResult, ScriberrError> {
        reject_unsupported_language(params, &["en"])?;

        let audio = scriberr_audio::auto_convert_if_requested(
            audio.clone(),
            get_bool(params, "auto_convert_audio"),
            &ctx.temp_directory,
        )
        .await;

        let attention_context = get_u32(params, "attention_context").unwrap_or(30);
        let args = vec![
            "--audio".to_string(),
            audio.effective_path().display().to_string(),
            "--attention-context".to_string(),
            attention_context.to_string(),
        ];

        let request = SubprocessRequest {
            binary: &self.binary_path,
            args,
            stdin: None,
        };
        let output: ParakeetOutput = run_json(request, &ctx.cancel)
            .await
            .map_err(map_subprocess_error)?;

        let word_segments: Vec<WordSegment> = output
            .words
            .iter()
            .map(|w| WordSegment {
                start: w.start,
                end: w.end,
                word: w.text.trim().to_string(),
                score: w.confidence,
                speaker: None,
            })
            .collect();

        let segments = vec![Segment {
            start: word_segments.first().map(|w| w.start).unwrap_or(0.0),
            end: word_segments.last().map(|w| w.end).unwrap_or(0.0),
            text: output.text.trim().to_string(),
            speaker: None,
        }];

        let mut result = TranscriptResult {
            segments,
            word_segments,
            language: Some("en".into()),
            text: output.text.trim().to_string(),
        };
        result.rebuild_text();
        Ok(result)
    }
}
