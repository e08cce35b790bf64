//! Webhook delivery (§4.4, §6): a detached task per terminal job status,
//! independent of the main processing path.
//!
//! Grounded in the teacher's `tokio::spawn` pattern for forwarding broadcast
//! events out of the processing path (`commands/transcription.rs::get_transcript_stream`
//! forwards transcript segments to a Tauri window via a detached task that's
//! joined nowhere); generalized here from "forward to UI" to "POST to a
//! callback URL". Failures are logged and never affect the job's terminal
//! status.

use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub job_id: String,
    pub status: String,
    pub audio_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub metadata: WebhookMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookMetadata {
    pub model: String,
    pub model_family: String,
    pub duration_ms: i64,
}

/// Fire the webhook POST on a detached task with `timeout`. Never awaited by
/// the caller — the job's terminal status is already persisted before this
/// is invoked.
pub fn dispatch_webhook(url: String, payload: WebhookPayload, timeout: Duration) {
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let result = client
            .post(&url)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!("webhook delivered to {url} for job {}", payload.job_id);
            }
            Ok(resp) => {
                tracing::warn!(
                    "webhook to {url} for job {} returned status {}",
                    payload.job_id,
                    resp.status()
                );
            }
            Err(e) => {
                tracing::warn!("webhook to {url} for job {} failed: {e}", payload.job_id);
            }
        }
    });
}
