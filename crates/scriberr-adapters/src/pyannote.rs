//! PyAnnote diarizer adapter. Local subprocess, configurable speaker bounds.

use std::path::PathBuf;

use async_trait::async_trait;
use scriberr_registry::{
    adapter::{DiarizationAdapter, ParameterMap, ProcContext},
    capability::{Capabilities, Features, ParameterSpec, ParameterType, QualityTier},
};
use scriberr_types::{AudioInput, DiarizationResult, DiarizationSegment, ScriberrError};
use scriberr_worker::{run_json, SubprocessRequest};
use serde::Deserialize;

use crate::common::{get_bool, get_u32, map_subprocess_error};

pub struct PyannoteAdapter {
    binary_path: PathBuf,
}

impl PyannoteAdapter {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[derive(Debug, Deserialize)]
struct PyannoteOutput {
    #[serde(default)]
    segments: Vec<PyannoteSegment>,
}

#[derive(Debug, Deserialize)]
struct PyannoteSegment {
    start: f64,
    end: f64,
    speaker: String,
    #[serde(default)]
    confidence: Option<f64>,
}

#[async_trait]
impl DiarizationAdapter for PyannoteAdapter {
    fn id(&self) -> &str {
        "pyannote"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: "pyannote".into(),
            model_family: "pyannote".into(),
            display_name: "PyAnnote".into(),
            supported_languages: Vec::new(),
            supported_formats: vec!["wav".into()],
            features: Features {
                diarization: true,
                ..Default::default()
            },
            quality_tier: QualityTier::High,
            memory_mb: 800,
            requires_gpu: false,
            requires_pcm16_mono_16k: true,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec {
                name: "min_speakers".into(),
                kind: ParameterType::Integer,
                required: false,
                default: None,
                options: None,
                min: Some(1.0),
                max: Some(20.0),
                description: "Lower bound on speaker count".into(),
            },
            ParameterSpec {
                name: "max_speakers".into(),
                kind: ParameterType::Integer,
                required: false,
                default: None,
                options: None,
                min: Some(1.0),
                max: Some(20.0),
                description: "Upper bound on speaker count".into(),
            },
        ]
    }

    async fn prepare_environment(&self) -> Result<(), ScriberrError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.binary_path.exists()
    }

    async fn diarize(
        &self,
        audio: &AudioInput,
        params: &ParameterMap,
        ctx: &ProcContext,
    ) -> Result<DiarizationResult, ScriberrError> {
        let audio = scriberr_audio::auto_convert_if_requested(
            audio.clone(),
            get_bool(params, "auto_convert_audio"),
            &ctx.temp_directory,
        )
        .await;

        let mut args = vec![
            "--audio".to_string(),
            audio.effective_path().display().to_string(),
        ];
        if let Some(min) = get_u32(params, "min_speakers") {
            args.push("--min-speakers".into());
            args.push(min.to_string());
        }
        if let Some(max) = get_u32(params, "max_speakers") {
            args.push("--max-speakers".into());
            args.push(max.to_string());
        }

        let request = SubprocessRequest {
            binary: &self.binary_path,
            args,
            stdin: None,
        };
        let output: PyannoteOutput = run_json(request, &ctx.cancel)
            .await
            .map_err(map_subprocess_error)?;

        let mut speakers: Vec<String> = Vec::new();
        let segments = output
            .segments
            .into_iter()
            .map(|s| {
                if !speakers.contains(&s.speaker) {
                    speakers.push(s.speaker.clone());
                }
                DiarizationSegment {
                    start: s.start,
                    end: s.end,
                    speaker: s.speaker,
                    confidence: s.confidence,
                }
            })
            .collect();

        Ok(DiarizationResult { segments, speakers })
    }
}
