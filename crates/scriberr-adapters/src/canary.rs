//! NVIDIA Canary multilingual ASR + translation adapter. Local subprocess.

use std::path::PathBuf;

use async_trait::async_trait;
use scriberr_registry::{
    adapter::{ParameterMap, ProcContext, TranscriptionAdapter},
    capability::{Capabilities, Features, ParameterSpec, ParameterType, QualityTier},
};
use scriberr_types::{AudioInput, ScriberrError, Segment, TranscriptResult, WordSegment};
use scriberr_worker::{run_json, SubprocessRequest};
use serde::Deserialize;

use crate::common::{get_bool, get_str, map_subprocess_error};

const SUPPORTED_LANGUAGES: &[&str] = &["en", "de", "es", "fr"];

pub struct CanaryAdapter {
    binary_path: PathBuf,
}

impl CanaryAdapter {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[derive(Debug, Deserialize)]
struct CanaryOutput {
    text: String,
    #[serde(default)]
    detected_language: Option<String>,
    #[serde(default)]
    words: Vec<CanaryWord>,
}

#[derive(Debug, Deserialize)]
struct CanaryWord {
    start: f64,
    end: f64,
    text: String,
}

#[async_trait]
impl TranscriptionAdapter for CanaryAdapter {
    fn id(&self) -> &str {
        "canary"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: "canary".into(),
            model_family: "canary".into(),
            display_name: "NVIDIA Canary".into(),
            supported_languages: SUPPORTED_LANGUAGES.iter().map(|s| s.to_string()).collect(),
            supported_formats: vec!["wav".into()],
            features: Features {
                timestamps: true,
                translation: true,
                diarization: false,
                longform: false,
            },
            quality_tier: QualityTier::High,
            memory_mb: 3000,
            requires_gpu: true,
            requires_pcm16_mono_16k: true,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec {
                name: "language".into(),
                kind: ParameterType::Enum,
                required: false,
                default: Some(serde_json::json!("en")),
                options: Some(SUPPORTED_LANGUAGES.iter().map(|s| s.to_string()).collect()),
                min: None,
                max: None,
                description: "Source language".into(),
            },
            ParameterSpec {
                name: "target_language".into(),
                kind: ParameterType::Enum,
                required: false,
                default: None,
                options: Some(SUPPORTED_LANGUAGES.iter().map(|s| s.to_string()).collect()),
                min: None,
                max: None,
                description: "Translate the output into this language instead".into(),
            },
        ]
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
        let source_lang = get_str(params, "language").unwrap_or("en");
        if !SUPPORTED_LANGUAGES.contains(&source_lang) {
            return Err(ScriberrError::invalid(
                "language",
                format!("unsupported language `{source_lang}`"),
            ));
        }

        let audio = scriberr_audio::auto_convert_if_requested(
            audio.clone(),
            get_bool(params, "auto_convert_audio"),
            &ctx.temp_directory,
        )
        .await;

        let mut args = vec![
            "--audio".to_string(),
            audio.effective_path().display().to_string(),
            "--source-lang".to_string(),
            source_lang.to_string(),
        ];
        if let Some(target) = get_str(params, "target_language") {
            if !SUPPORTED_LANGUAGES.contains(&target) {
                return Err(ScriberrError::invalid(
                    "target_language",
                    format!("unsupported target language `{target}`"),
                ));
            }
            args.push("--target-lang".into());
            args.push(target.to_string());
        }

        let request = SubprocessRequest {
            binary: &self.binary_path,
            args,
            stdin: None,
        };
        let output: CanaryOutput = run_json(request, &ctx.cancel)
            .await
            .map_err(map_subprocess_error)?;

        let word_segments: Vec<WordSegment> = output
            .words
            .iter()
            .map(|w| WordSegment {
                start: w.start,
                end: w.end,
                word: w.text.trim().to_string(),
                score: None,
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
            language: output.detected_language.or_else(|| Some(source_lang.to_string())),
            text: output.text.trim().to_string(),
        };
        result.rebuild_text();
        Ok(result)
    }
}
