//! Process-wide knobs the processor, preprocessor, and registry all need.
//!
//! Plain `serde`-deserializable struct with a `Default` impl, the way the
//! teacher loads its `Settings`/`ConfigSettings` structs (`state/mod.rs`) —
//! not a bespoke config DSL.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for adapter scratch space and audio-conversion temp
    /// files. Each job gets its own subdirectory under here.
    pub temp_directory: PathBuf,
    /// Job-level worker pool size (`scriberr-engine::pool`).
    pub max_concurrent_jobs: usize,
    /// Path to the `ffprobe`-compatible binary used by the preprocessor.
    pub probe_binary: PathBuf,
    /// Webhook POST timeout, in seconds.
    pub webhook_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temp_directory: std::env::temp_dir().join("scriberr"),
            max_concurrent_jobs: 4,
            probe_binary: PathBuf::from("ffprobe"),
            webhook_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    /// The scratch directory for one job's adapter calls and audio
    /// conversions, e.g. `{temp_directory}/{job_id}`.
    pub fn job_temp_directory(&self, job_id: &str) -> PathBuf {
        self.temp_directory.join(job_id)
    }
}
