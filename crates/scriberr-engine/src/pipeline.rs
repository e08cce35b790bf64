//! The single-track processing steps shared by [`crate::processor::JobProcessor`]
//! (top-level single-track jobs) and [`crate::orchestrator::Orchestrator`]
//! (one call per track of a multi-track job) — §4.4 steps 4-5.

use std::collections::HashMap;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use scriberr_registry::adapter::ProcContext;
use scriberr_registry::capability::{Features, Requirements};
use scriberr_registry::ModelRegistry;
use scriberr_types::{AudioInput, Parameters, ScriberrError, TranscriptResult};

use crate::config::EngineConfig;

/// Select the transcription model named in `parameters.model_id` if set,
/// otherwise fall back to the registry's best-match scoring. Either way,
/// the caller is responsible for checking readiness via `is_ready()` before
/// committing to the selection in a production deployment; here an unready
/// adapter is still returned (it will simply fail its own call).
async fn select_transcription(
    registry: &ModelRegistry,
    parameters: &Parameters,
    force_timestamps: bool,
) -> Result<std::sync::Arc<dyn scriberr_registry::adapter::TranscriptionAdapter>, ScriberrError> {
    if !parameters.model_id.is_empty() {
        return registry.get_transcription(&parameters.model_id).await;
    }
    let requirements = Requirements {
        language: parameters.language.clone(),
        features: Features {
            timestamps: force_timestamps,
            translation: parameters.target_language.is_some(),
            diarization: parameters.diarize,
            longform: false,
        },
        min_quality: None,
    };
    registry
        .select_best_transcription(&requirements)
        .await
        .ok_or_else(|| ScriberrError::UnknownModel("<no transcription adapter available>".into()))
}

async fn select_diarization(
    registry: &ModelRegistry,
    parameters: &Parameters,
) -> Result<std::sync::Arc<dyn scriberr_registry::adapter::DiarizationAdapter>, ScriberrError> {
    if let Some(id) = &parameters.diarization_model_id {
        return registry.get_diarization(id).await;
    }
    let requirements = Requirements {
        language: parameters.language.clone(),
        features: Features::default(),
        min_quality: None,
    };
    registry
        .select_best_diarization(&requirements)
        .await
        .ok_or_else(|| ScriberrError::UnknownModel("<no diarization adapter available>".into()))
}

/// Run the transcribe → (optional) diarize → (optional) fuse pipeline on one
/// audio file. `force_timestamps` is set by the orchestrator for track
/// children (§4.6 step 2: "word-level timestamps forced on") and left false
/// for ordinary single-track jobs, where the caller's own `model_id` choice
/// governs timestamp support.
pub async fn run_single_track(
    registry: &ModelRegistry,
    config: &EngineConfig,
    job_temp_dir: &Path,
    audio_path: &Path,
    parameters: &Parameters,
    force_timestamps: bool,
    cancel: &CancellationToken,
) -> Result<TranscriptResult, ScriberrError> {
    let audio = scriberr_audio::build_audio_input(&config.probe_binary, audio_path.to_path_buf(), cancel).await;

    let transcription_adapter = select_transcription(registry, parameters, force_timestamps).await?;
    let requires_pcm16_mono_16k = transcription_adapter.capabilities().requires_pcm16_mono_16k;
    let audio = preprocess_for(&audio, job_temp_dir, requires_pcm16_mono_16k).await;

    let proc_ctx = ProcContext {
        cancel: cancel.clone(),
        temp_directory: job_temp_dir.to_path_buf(),
    };
    let params_map = parameters_to_map(parameters);

    if cancel.is_cancelled() {
        return Err(ScriberrError::Canceled);
    }

    let transcript = transcription_adapter
        .transcribe(&audio, &params_map, &proc_ctx)
        .await?;

    if !parameters.diarize {
        cleanup_temp(&audio).await;
        return Ok(transcript);
    }

    if cancel.is_cancelled() {
        cleanup_temp(&audio).await;
        return Err(ScriberrError::Canceled);
    }

    let diarization_adapter = match select_diarization(registry, parameters).await {
        Ok(a) => a,
        Err(e) => {
            tracing::warn!("diarization model selection failed, saving transcript without speaker attribution: {e}");
            cleanup_temp(&audio).await;
            return Ok(transcript);
        }
    };

    let fused = match diarization_adapter.diarize(&audio, &params_map, &proc_ctx).await {
        Ok(diarization) => scriberr_fusion::fuse(&transcript, &diarization),
        Err(e) if e.is_diarization_only() => {
            tracing::warn!("diarization failed, saving transcript without speaker attribution: {e}");
            transcript
        }
        Err(e) => {
            cleanup_temp(&audio).await;
            return Err(e);
        }
    };

    cleanup_temp(&audio).await;
    Ok(fused)
}

/// §4.3: convert to 16 kHz mono PCM16 under the job's temp directory, but
/// only when the selected adapter actually requires that shape — adapters
/// that accept the source format natively (e.g. the cloud adapter) see the
/// original `AudioInput` untouched.
async fn preprocess_for(audio: &AudioInput, job_temp_dir: &Path, requires_pcm16_mono_16k: bool) -> AudioInput {
    if !requires_pcm16_mono_16k {
        return audio.clone();
    }
    scriberr_audio::ensure_pcm16_mono_16k(audio.clone(), job_temp_dir).await
}

/// The Job Processor owns deletion of whatever `temp_path` the preprocessor
/// set, on every exit path (§4.3's scoped-acquisition guarantee).
async fn cleanup_temp(audio: &AudioInput) {
    if let Some(temp_path) = &audio.temp_path {
        if let Err(e) = tokio::fs::remove_file(temp_path).await {
            tracing::warn!("failed to remove temp file {}: {e}", temp_path.display());
        }
    }
}

fn parameters_to_map(parameters: &Parameters) -> HashMap<String, serde_json::Value> {
    let mut map = parameters.extra.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<HashMap<_, _>>();
    map.insert("auto_convert_audio".into(), serde_json::json!(parameters.auto_convert_audio));
    if let Some(lang) = &parameters.language {
        map.insert("language".into(), serde_json::json!(lang));
    }
    if let Some(target) = &parameters.target_language {
        map.insert("target_language".into(), serde_json::json!(target));
    }
    if let Some(min) = parameters.min_speakers {
        map.insert("min_speakers".into(), serde_json::json!(min));
    }
    if let Some(max) = parameters.max_speakers {
        map.insert("max_speakers".into(), serde_json::json!(max));
    }
    if let Some(ctx) = parameters.attention_context {
        map.insert("attention_context".into(), serde_json::json!(ctx));
    }
    if let Some(key) = &parameters.openai_api_key {
        map.insert("openai_api_key".into(), serde_json::json!(key));
    }
    if let Some(budget) = parameters.voxtral_token_budget {
        map.insert("voxtral_token_budget".into(), serde_json::json!(budget));
    }
    map
}
