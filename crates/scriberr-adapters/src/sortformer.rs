//! NVIDIA Sortformer diarizer adapter. Hard cap of 4 speakers, no auth.

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

const MAX_SPEAKERS: u32 = 4;

pub struct SortformerAdapter {
    binary_path: PathBuf,
}

impl SortformerAdapter {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[derive(Debug, Deserialize)]
struct SortformerOutput {
    #[serde(default)]
    segments: Vec<SortformerSegment>,
}

#[derive(Debug, Deserialize)]
struct SortformerSegment {
    start: f64,
    end: f64,
    speaker: String,
}

#[async_trait]
impl DiarizationAdapter for SortformerAdapter {
    fn id(&self) -> &str {
        "sortformer"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: "sortformer".into(),
            model_family: "sortformer".into(),
            display_name: "NVIDIA Sortformer".into(),
            supported_languages: Vec::new(),
            supported_formats: vec!["wav".into()],
            features: Features {
                diarization: true,
                ..Default::default()
            },
            quality_tier: QualityTier::Standard,
            memory_mb: 600,
            requires_gpu: true,
            requires_pcm16_mono_16k: true,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec {
            name: "max_speakers".into(),
            kind: ParameterType::Integer,
            required: false,
            default: Some(serde_json::json!(MAX_SPEAKERS)),
            options: None,
            min: Some(1.0),
            max: Some(MAX_SPEAKERS as f64),
            description: "Upper bound on speaker count, hard-capped at 4".into(),
        }]
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
        if let Some(requested) = get_u32(params, "max_speakers") {
            if requested > MAX_SPEAKERS {
                return Err(ScriberrError::invalid(
                    "max_speakers",
                    format!("sortformer supports at most {MAX_SPEAKERS} speakers, got {requested}"),
                ));
            }
        }

        let audio = scriberr_audio::auto_convert_if_requested(
            audio.clone(),
            get_bool(params, "auto_convert_audio"),
            &ctx.temp_directory,
        )
        .await;

        let max_speakers = get_u32(params, "max_speakers").unwrap_or(MAX_SPEAKERS);
        let args = vec![
            "--audio".to_string(),
            audio.effective_path().display().to_string(),
            "--max-speakers".to_string(),
            max_speakers.to_string(),
        ];

        let request = SubprocessRequest {
            binary: &self.binary_path,
            args,
            stdin: None,
        };
        let output: SortformerOutput = run_json(request, &ctx.cancel)
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
                    confidence: None,
                }
            })
            .collect();

        Ok(DiarizationResult { segments, speakers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_more_than_four_speakers() {
        let adapter = SortformerAdapter::new(PathBuf::from("/bin/true"));
        let mut params = ParameterMap::new();
        params.insert("max_speakers".into(), serde_json::json!(5));
        let ctx = ProcContext::new(std::env::temp_dir());
        let audio = AudioInput {
            path: PathBuf::from("/tmp/a.wav"),
            format: "pcm_s16le".into(),
            duration_seconds: 1.0,
            sample_rate: 16_000,
            channel_count: 1,
            size_bytes: 0,
            temp_path: None,
        };
        let err = adapter.diarize(&audio, &params, &ctx).await.unwrap_err();
        assert!(matches!(err, ScriberrError::InvalidParameters { .. }));
    }
}
