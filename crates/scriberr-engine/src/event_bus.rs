//! Progress & Event Bus (§4.7): `job_update` events on every status
//! transition, plus per-track milestones on multi-track jobs.
//!
//! Mirrors the teacher's `broadcast::channel(100)` + `subscribe_transcripts()`
//! idiom (`state/mod.rs`) verbatim, generalized from "transcript segment" to
//! "job status/track event" payloads. Delivery is best-effort and lossy —
//! subscribers that fall behind the channel capacity miss events and must
//! re-read the job row on reconnect, per spec.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use scriberr_types::JobId;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    JobUpdate {
        job_id: JobId,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    TrackCompleted {
        job_id: JobId,
        track_name: String,
        index: usize,
        total: usize,
    },
}

pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Best-effort publish. No receivers is not an error — it just means
    /// nobody is currently subscribed.
    pub fn publish(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }
}
