//! OpenAI hosted ASR adapter. No local subprocess: a `reqwest` multipart
//! upload over HTTPS. Grounded in the teacher's `OpenAISTTProvider`
//! (bearer auth, status-code-to-error-kind mapping, verbose_json parsing).

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use scriberr_registry::{
    adapter::{ParameterMap, ProcContext, TranscriptionAdapter},
    capability::{Capabilities, Features, ParameterSpec, ParameterType, QualityTier},
};
use scriberr_types::{AudioInput, ScriberrError, Segment, TranscriptResult};
use serde::Deserialize;
use std::time::Duration;

use crate::common::get_str;

const API_BASE: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiCloudAdapter {
    client: reqwest::Client,
    model: String,
}

impl OpenAiCloudAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WhisperApiResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Option<Vec<WhisperApiSegment>>,
}

#[derive(Debug, Deserialize)]
struct WhisperApiSegment {
    start: f64,
    end: f64,
    text: String,
}

#[async_trait]
impl TranscriptionAdapter for OpenAiCloudAdapter {
    fn id(&self) -> &str {
        "openai_cloud"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            model_id: "openai_cloud".into(),
            model_family: "openai".into(),
            display_name: "OpenAI Whisper API".into(),
            supported_languages: vec!["en", "es", "fr", "de", "ru", "zh", "ja", "pt", "it"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            supported_formats: vec!["wav".into(), "mp3".into(), "m4a".into()],
            features: Features {
                // The API omits word timestamps (§4.2): sentence-level only.
                timestamps: false,
                translation: false,
                diarization: false,
                longform: false,
            },
            quality_tier: QualityTier::Standard,
            memory_mb: 0,
            requires_gpu: false,
            // The API accepts wav/mp3/m4a natively; no local conversion needed.
            requires_pcm16_mono_16k: false,
            metadata: Default::default(),
        }
    }

    fn parameter_schema(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec {
                name: "openai_api_key".into(),
                kind: ParameterType::String,
                required: true,
                default: None,
                options: None,
                min: None,
                max: None,
                description: "OpenAI API key".into(),
            },
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
        ]
    }

    async fn prepare_environment(&self) -> Result<(), ScriberrError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        // No local weights to warm up; readiness is verified per-call via
        // the API key the caller supplies.
        true
    }

    async fn transcribe(
        &self,
        audio: &AudioInput,
        params: &ParameterMap,
        _ctx: &ProcContext,
    ) -> Result<TranscriptResult, ScriberrError> {
        let api_key = get_str(params, "openai_api_key").ok_or_else(|| {
            ScriberrError::invalid("openai_api_key", "required for the openai_cloud adapter")
        })?;

        let bytes = tokio::fs::read(audio.effective_path())
            .await
            .map_err(|e| ScriberrError::AudioUnreadable(e.to_string()))?;

        let file_part = Part::bytes(bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ScriberrError::AdapterRuntime {
                stderr: e.to_string(),
            })?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        if let Some(lang) = get_str(params, "language") {
            form = form.text("language", lang.to_string());
        }

        let url = format!("{API_BASE}/audio/transcriptions");
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ScriberrError::AdapterRuntime {
                stderr: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match status.as_u16() {
                401 => "invalid API key".to_string(),
                429 => "rate limited".to_string(),
                500..=599 => format!("server error: {body}"),
                _ => format!("HTTP {status}: {body}"),
            };
            return Err(ScriberrError::AdapterRuntime { stderr: message });
        }

        let parsed: WhisperApiResponse = response.json().await.map_err(|e| ScriberrError::AdapterRuntime {
            stderr: format!("failed to parse response: {e}"),
        })?;

        let segments: Vec<Segment> = parsed
            .segments
            .unwrap_or_default()
            .into_iter()
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
            language: parsed.language,
            text: parsed.text.trim().to_string(),
        };
        result.rebuild_text();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn never_advertises_timestamps() {
        let adapter = OpenAiCloudAdapter::new("whisper-1");
        assert!(!adapter.capabilities().features.timestamps);
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected_before_any_request() {
        let adapter = OpenAiCloudAdapter::new("whisper-1");
        let ctx = ProcContext::new(std::env::temp_dir());
        let audio = AudioInput {
            path: std::path::PathBuf::from("/tmp/a.wav"),
            format: "pcm_s16le".into(),
            duration_seconds: 1.0,
            sample_rate: 16_000,
            channel_count: 1,
            size_bytes: 0,
            temp_path: None,
        };
        let err = adapter
            .transcribe(&audio, &HashMap::new(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ScriberrError::InvalidParameters { .. }));
    }

    #[tokio::test]
    async fn successful_transcription_round_trips_segments() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/audio/transcriptions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"text":"hello world","language":"en","segments":[{"start":0.0,"end":1.0,"text":"hello world"}]}"#,
            )
            .create_async()
            .await;

        // This adapter hardcodes api.openai.com, so this test only exercises
        // the response-parsing path via a direct call through reqwest to
        // the mock server rather than through `transcribe` end-to-end.
        let response = reqwest::Client::new()
            .post(format!("{}/v1/audio/transcriptions", server.url()))
            .send()
            .await
            .unwrap();
        let parsed: WhisperApiResponse = response.json().await.unwrap();
        assert_eq!(parsed.text, "hello world");
        assert_eq!(parsed.segments.unwrap().len(), 1);
    }
}
