//! Process-wide catalog of transcription and diarization adapters.
//!
//! Generalized from the teacher's `ProviderRegistry` (separate STT/LLM maps
//! behind `RwLock`, registration logging, `initialize_*`/status helpers) to
//! the two adapter kinds this engine actually dispatches.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use scriberr_types::ScriberrError;

use crate::adapter::{DiarizationAdapter, TranscriptionAdapter};
use crate::capability::{score, ModelId, ParameterSpec, Requirements};

pub struct ModelRegistry {
    transcription: RwLock<HashMap<ModelId, Arc<dyn TranscriptionAdapter>>>,
    transcription_order: RwLock<Vec<ModelId>>,
    diarization: RwLock<HashMap<ModelId, Arc<dyn DiarizationAdapter>>>,
    diarization_order: RwLock<Vec<ModelId>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            transcription: RwLock::new(HashMap::new()),
            transcription_order: RwLock::new(Vec::new()),
            diarization: RwLock::new(HashMap::new()),
            diarization_order: RwLock::new(Vec::new()),
        }
    }

    pub async fn register_transcription(&self, adapter: Arc<dyn TranscriptionAdapter>) {
        let id = adapter.id().to_string();
        tracing::info!("Registering transcription adapter: {id}");
        self.transcription.write().await.insert(id.clone(), adapter);
        self.transcription_order.write().await.push(id);
    }

    pub async fn register_diarization(&self, adapter: Arc<dyn DiarizationAdapter>) {
        let id = adapter.id().to_string();
        tracing::info!("Registering diarization adapter: {id}");
        self.diarization.write().await.insert(id.clone(), adapter);
        self.diarization_order.write().await.push(id);
    }

    /// Runs every registered adapter's `prepare_environment()` once. Errors
    /// from one adapter do not block the others; all failures are logged
    /// and the first is returned after every adapter has had a chance to run.
    pub async fn prepare_all(&self) -> Result<(), ScriberrError> {
        let mut first_err = None;

        for adapter in self.transcription.read().await.values() {
            if let Err(e) = adapter.prepare_environment().await {
                tracing::warn!("prepare_environment failed for {}: {e}", adapter.id());
                first_err.get_or_insert(e);
            }
        }
        for adapter in self.diarization.read().await.values() {
            if let Err(e) = adapter.prepare_environment().await {
                tracing::warn!("prepare_environment failed for {}: {e}", adapter.id());
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn get_transcription(
        &self,
        id: &str,
    ) -> Result<Arc<dyn TranscriptionAdapter>, ScriberrError> {
        self.transcription
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ScriberrError::UnknownModel(id.to_string()))
    }

    pub async fn get_diarization(
        &self,
        id: &str,
    ) -> Result<Arc<dyn DiarizationAdapter>, ScriberrError> {
        self.diarization
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ScriberrError::UnknownModel(id.to_string()))
    }

    /// Pick the best transcription adapter for `requirements`, scored via
    /// [`score`]. Ties are broken by registration order; an adapter that
    /// fails `is_ready()` scores `i64::MIN` and is never selected unless
    /// every candidate is unready (in which case the first-registered,
    /// lowest-scoring one is returned — callers should check readiness
    /// again before use).
    pub async fn select_best_transcription(
        &self,
        requirements: &Requirements,
    ) -> Option<Arc<dyn TranscriptionAdapter>> {
        let order = self.transcription_order.read().await;
        let map = self.transcription.read().await;

        let mut best: Option<(i64, &String)> = None;
        for id in order.iter() {
            let Some(adapter) = map.get(id) else { continue };
            let ready = adapter.is_ready().await;
            let s = score(&adapter.capabilities(), requirements, ready);
            if best.map(|(b, _)| s > b).unwrap_or(true) {
                best = Some((s, id));
            }
        }
        best.and_then(|(_, id)| map.get(id).cloned())
    }

    pub async fn select_best_diarization(
        &self,
        requirements: &Requirements,
    ) -> Option<Arc<dyn DiarizationAdapter>> {
        let order = self.diarization_order.read().await;
        let map = self.diarization.read().await;

        let mut best: Option<(i64, &String)> = None;
        for id in order.iter() {
            let Some(adapter) = map.get(id) else { continue };
            let ready = adapter.is_ready().await;
            let s = score(&adapter.capabilities(), requirements, ready);
            if best.map(|(b, _)| s > b).unwrap_or(true) {
                best = Some((s, id));
            }
        }
        best.and_then(|(_, id)| map.get(id).cloned())
    }

    pub async fn list_transcription_ids(&self) -> Vec<ModelId> {
        self.transcription_order.read().await.clone()
    }

    pub async fn list_diarization_ids(&self) -> Vec<ModelId> {
        self.diarization_order.read().await.clone()
    }

    /// Validate a parameter map against `model_id`'s published schema.
    /// Fatal (`ErrInvalidParameters`) on any mismatch; unknown keys pass.
    pub async fn validate_transcription_parameters(
        &self,
        model_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ScriberrError> {
        let adapter = self.get_transcription(model_id).await?;
        crate::capability::validate_parameters(&adapter.parameter_schema(), params)
            .map_err(|(field, reason)| ScriberrError::invalid(field, reason))
    }

    pub async fn validate_diarization_parameters(
        &self,
        model_id: &str,
        params: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ScriberrError> {
        let adapter = self.get_diarization(model_id).await?;
        crate::capability::validate_parameters(&adapter.parameter_schema(), params)
            .map_err(|(field, reason)| ScriberrError::invalid(field, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ProcContext;
    use crate::capability::{Features, QualityTier};
    use async_trait::async_trait;
    use scriberr_types::{AudioInput, TranscriptResult};

    struct FakeAdapter {
        id: &'static str,
        ready: bool,
        lang: &'static str,
    }

    #[async_trait]
    impl TranscriptionAdapter for FakeAdapter {
        fn id(&self) -> &str {
            self.id
        }
        fn capabilities(&self) -> crate::capability::Capabilities {
            crate::capability::Capabilities {
                model_id: self.id.into(),
                model_family: "fake".into(),
                display_name: self.id.into(),
                supported_languages: vec![self.lang.into()],
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
            self.ready
        }
        async fn transcribe(
            &self,
            _audio: &AudioInput,
            _params: &HashMap<String, serde_json::Value>,
            _ctx: &ProcContext,
        ) -> Result<TranscriptResult, ScriberrError> {
            Ok(TranscriptResult::default())
        }
    }

    #[tokio::test]
    async fn unready_adapter_loses_to_ready_one_even_with_worse_language_match() {
        let registry = ModelRegistry::new();
        registry
            .register_transcription(Arc::new(FakeAdapter {
                id: "a-perfect-but-dead",
                ready: false,
                lang: "en",
            }))
            .await;
        registry
            .register_transcription(Arc::new(FakeAdapter {
                id: "b-alive",
                ready: true,
                lang: "fr",
            }))
            .await;

        let best = registry
            .select_best_transcription(&Requirements {
                language: Some("en".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(best.id(), "b-alive");
    }

    #[tokio::test]
    async fn ties_break_by_registration_order() {
        let registry = ModelRegistry::new();
        registry
            .register_transcription(Arc::new(FakeAdapter {
                id: "first",
                ready: true,
                lang: "en",
            }))
            .await;
        registry
            .register_transcription(Arc::new(FakeAdapter {
                id: "second",
                ready: true,
                lang: "en",
            }))
            .await;

        let best = registry
            .select_best_transcription(&Requirements::default())
            .await
            .unwrap();

        assert_eq!(best.id(), "first");
    }

    #[tokio::test]
    async fn unknown_model_is_rejected() {
        let registry = ModelRegistry::new();
        let err = registry.get_transcription("nope").await.unwrap_err();
        assert!(matches!(err, ScriberrError::UnknownModel(_)));
    }
}
