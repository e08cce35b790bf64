//! The audio preprocessor (§4.3): probe, then convert to 16 kHz mono PCM16
//! when an adapter requires it and the source isn't already in that shape.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use scriberr_types::AudioInput;

use crate::file_io;
use crate::probe::probe;

const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Probe `path` and build the initial [`AudioInput`]. On probe failure,
/// returns a best-effort `AudioInput` with zeroed fields and logs a
/// warning — callers (the Job Processor) proceed with it regardless,
/// since adapters are required to cope (§4.3 step 3).
pub async fn build_audio_input(
    probe_binary: &Path,
    path: PathBuf,
    cancel: &CancellationToken,
) -> AudioInput {
    let size_bytes = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);

    match probe(probe_binary, &path, cancel).await {
        Ok(probed) => AudioInput {
            path,
            format: probed.format,
            duration_seconds: probed.duration_seconds,
            sample_rate: probed.sample_rate,
            channel_count: probed.channel_count,
            size_bytes,
            temp_path: None,
        },
        Err(e) => {
            tracing::warn!("probe failed for {}: {e}", path.display());
            AudioInput {
                path,
                format: String::new(),
                duration_seconds: 0.0,
                sample_rate: 0,
                channel_count: 0,
                size_bytes,
                temp_path: None,
            }
        }
    }
}

/// If `audio` is not already 16 kHz mono PCM16, decode and resample it into
/// a fresh WAV under `temp_directory` and set `temp_path` accordingly.
/// On any conversion failure, logs a warning and returns `audio` unchanged
/// (§4.3 step 3) — the Job Processor still owns cleanup of whatever
/// `temp_path` ends up set, on every exit path.
pub async fn ensure_pcm16_mono_16k(audio: AudioInput, temp_directory: &Path) -> AudioInput {
    if audio.is_pcm16_mono_16k() {
        return audio;
    }

    let source_path = audio.path.clone();
    let temp_directory = temp_directory.to_path_buf();

    let converted = tokio::task::spawn_blocking(move || -> anyhow::Result<PathBuf> {
        let samples = file_io::load_audio_file(&source_path)?;
        let wav_bytes = file_io::samples_to_wav_bytes(&samples, TARGET_SAMPLE_RATE)?;

        std::fs::create_dir_all(&temp_directory)?;
        let out_path = temp_directory.join(format!(
            "{}-16k-mono.wav",
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&out_path, wav_bytes)?;
        Ok(out_path)
    })
    .await;

    match converted {
        Ok(Ok(temp_path)) => AudioInput {
            temp_path: Some(temp_path),
            format: "pcm_s16le".to_string(),
            sample_rate: TARGET_SAMPLE_RATE,
            channel_count: 1,
            ..audio
        },
        Ok(Err(e)) => {
            tracing::warn!("audio conversion failed for {}: {e}", audio.path.display());
            audio
        }
        Err(e) => {
            tracing::warn!("audio conversion task panicked for {}: {e}", audio.path.display());
            audio
        }
    }
}

/// §4.2's adapter-side fallback: if `audio` isn't already 16 kHz mono PCM16
/// and the caller opted into `auto_convert_audio`, convert it locally. This
/// is how an adapter copes when the shared preprocessor already ran and the
/// audio still isn't in the shape the adapter requires.
pub async fn auto_convert_if_requested(
    audio: AudioInput,
    auto_convert_audio: bool,
    temp_directory: &Path,
) -> AudioInput {
    if audio.is_pcm16_mono_16k() || !auto_convert_audio {
        return audio;
    }
    ensure_pcm16_mono_16k(audio, temp_directory).await
}
