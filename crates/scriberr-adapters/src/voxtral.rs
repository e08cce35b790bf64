//! Voxtral local ASR adapter. Never produces word-level timestamps (§4.2):
//! only sentence-level segments come back, with an empty `word_segments`.

use std::path::PathBuf;

use async_trait::async_trait;
use scriberr_registry::{
    adapter::{ParameterMap, ProcContext, TranscriptionAdapter},
    capability::{Capabilities, Features, ParameterSpec, ParameterType, QualityTier},
};
use scriberr_types::{AudioInput, ScriberrError, Segment, TranscriptResult};
use scriberr_worker::{run_json, SubprocessRequest};
use serde::Deserialize;

use crate::common::{get_bool, map_subprocess_error};

pub struct VoxtralAdapter {
    binary_path: PathBuf,
}

impl VoxtralAdapter {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[derive(Debug, Deserialize)]
struct VoxtralOutput {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<VoxtralSegment>,
}

#[derive(Debug, Deserialize)]
struct VoxtralSegment {
    start: f64,
    end: f64,
    text: String,
}

#[async_trait]
impl TranscriptionAdapter for VoxtralAdapter {
    fn id(&self) -> &str {
        "voxtral"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: "voxtral".into(),
            model_family: "voxtral".into(),
            display_name: "Voxtral".into(),
            supported_languages: vec!["en", "fr", "de", "es", "it"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            supported_formats: vec!["wav".into()],
            features: Features {
                timestamps: false,
                translation: false,
                diarization: false,
                longform: false,
            },
            quality_tier: QualityTier::Standard,
            memory_mb: 1200,
            requires_gpu: false,
            requires_pcm16_mono_16k: true,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec {
            name: "voxtral_token_budget".into(),
            kind: ParameterType::Integer,
            required: false,
            default: Some(serde_json::json!(4096)),
            options: None,
            min: Some(128.0),
            max: Some(32_768.0),
            description: "Maximum decode tokens".into(),
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
        let audio = scriberr_audio::auto_convert_if_requested(
            audio.clone(),
            get_bool(params, "auto_convert_audio"),
            &ctx.temp_directory,
        )
        .await;

        let token_budget = params
            .get("voxtral_token_budget")
            .and_then(|v| v.as_u64())
            .unwrap_or(4096);

        let args = vec![
            "--audio".to_string(),
            audio.effective_path().display().to_string(),
            "--max-tokens".to_string(),
            token_budget.to_string(),
        ];

        let request = SubprocessRequest {
            binary: &self.binary_path,
            args,
            stdin: None,
        };
        let output: VoxtralOutput = run_json(request, &ctx.cancel)
            .await
            .map_err(map_subprocess_error)?;

        let segments: Vec<Segment> = output
            .segments
            .iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                text: s.text.trim().to_string(),
                speaker: None,
            })
            .collect();

        let mut result = TranscriptResult {
            segments,
            word_segments: Vec::new(),
            language: output.language,
            text: output.text.trim().to_string(),
        };
        result.rebuild_text();
        Ok(result)
    }
}
