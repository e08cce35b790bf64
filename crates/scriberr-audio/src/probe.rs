//! Probing a file for sample rate, channel count, and duration via an
//! external `ffprobe`-compatible binary (§4.3 step 1, §6's documented
//! `probe -quiet -print_format json -show_format -show_streams <path>`).

use std::path::Path;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use scriberr_types::ScriberrError;

#[derive(Debug, Clone)]
pub struct ProbedAudio {
    pub format: String,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub duration_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    sample_rate: Option<String>,
    #[serde(default)]
    channels: Option<u16>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

/// Probe `path` with `probe_binary`. On any failure — spawn, parse, or a
/// missing audio stream — returns `Err`; the caller (§4.3 step 3) is
/// responsible for falling back to the unconverted `AudioInput`.
pub async fn probe(
    probe_binary: &Path,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<ProbedAudio, ScriberrError> {
    let request = scriberr_worker::SubprocessRequest {
        binary: probe_binary,
        args: vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path.display().to_string(),
        ],
        stdin: None,
    };

    let output: ProbeOutput = scriberr_worker::run_json(request, cancel)
        .await
        .map_err(|e| ScriberrError::AudioUnreadable(e.to_string()))?;

    let audio_stream = output
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .ok_or_else(|| ScriberrError::AudioUnreadable("no audio stream found".into()))?;

    let sample_rate: u32 = audio_stream
        .sample_rate
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ScriberrError::AudioUnreadable("missing sample rate".into()))?;

    let channel_count = audio_stream.channels.unwrap_or(1);

    let duration_seconds = audio_stream
        .duration
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| {
            output
                .format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|s| s.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    Ok(ProbedAudio {
        format: audio_stream.codec_name.clone().unwrap_or_default(),
        sample_rate,
        channel_count,
        duration_seconds,
    })
}
