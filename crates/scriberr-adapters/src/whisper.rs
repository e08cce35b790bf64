//! Whisper-family ASR adapter. Local subprocess, word-level timestamps,
//! broad language support.

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

pub struct WhisperAdapter {
    binary_path: PathBuf,
}

impl WhisperAdapter {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }
}

#[derive(Debug, Deserialize)]
struct WhisperCliOutput {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperCliSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperCliSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Vec<WhisperCliWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperCliWord {
    start: f64,
    end: f64,
    word: String,
    #[serde(default)]
    probability: Option<f64>,
}

#[async_trait]
impl TranscriptionAdapter for WhisperAdapter {
    fn id(&self) -> &str {
        "whisper"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: "whisper".into(),
            model_family: "whisper".into(),
            display_name: "Whisper".into(),
            supported_languages: vec!["en", "es", "fr", "de", "ru", "zh", "ja"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            supported_formats: vec!["wav".into(), "flac".into(), "mp3".into()],
            features: Features {
                timestamps: true,
                translation: false,
                diarization: false,
                longform: false,
            },
            quality_tier: QualityTier::Standard,
            memory_mb: 1500,
            requires_gpu: true,
            requires_pcm16_mono_16k: true,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec {
                name: "language".into(),
                kind: ParameterType::String,
                required: false,
                default: None,
                options: None,
                min: None,
                max: None,
                description: "ISO 639-1 language hint".into(),
            },
            ParameterSpec {
                name: "beam_size".into(),
                kind: ParameterType::Integer,
                required: false,
                default: Some(serde_json::json!(5)),
                options: None,
                min: Some(1.0),
                max: Some(10.0),
                description: "Beam search width".into(),
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
        let audio = scriberr_audio::auto_convert_if_requested(
            audio.clone(),
            get_bool(params, "auto_convert_audio"),
            &ctx.temp_directory,
        )
        .await;

        let mut args = vec![
            "--audio".to_string(),
            audio.effective_path().display().to_string(),
            "--word-timestamps".to_string(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if let Some(lang) = get_str(params, "language") {
            args.push("--language".into());
            args.push(lang.to_string());
        }
        let beam_size = params
            .get("beam_size")
            .and_then(|v| v.as_u64())
            .unwrap_or(5);
        args.push("--beam-size".into());
        args.push(beam_size.to_string());

        let request = SubprocessRequest {
            binary: &self.binary_path,
            args,
            stdin: None,
        };
        let output: WhisperCliOutput = run_json(request, &ctx.cancel)
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

        let word_segments: Vec<WordSegment> = output
            .segments
            .iter()
            .flat_map(|s| s.words.iter())
            .map(|w| WordSegment {
                start: w.start,
                end: w.end,
                word: w.word.trim().to_string(),
                score: w.probability,
                speaker: None,
            })
            .collect();

        let mut result = TranscriptResult {
            segments,
            word_segments,
            language: output.language,
            text: output.text.trim().to_string(),
        };
        result.rebuild_text();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_not_ready() {
        let adapter = WhisperAdapter::new(PathBuf::from("/nonexistent/whisper-cli"));
        assert!(!adapter.is_ready().await);
    }

    #[test]
    fn capabilities_advertise_timestamps() {
        let adapter = WhisperAdapter::new(PathBuf::from("/bin/true"));
        assert!(adapter.capabilities().features.timestamps);
    }
}
