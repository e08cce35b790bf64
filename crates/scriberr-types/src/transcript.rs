//! Canonical transcript wire format (§6): the shape every adapter produces
//! and every fusion/merge step consumes. Field names follow the JSON
//! contract (snake_case) rather than Rust convention so `serde_json` output
//! matches what downstream consumers already expect.

use serde::{Deserialize, Serialize};

/// A contiguous span of speech with its recognized text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// A single recognized word with its timing and confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSegment {
    pub start: f64,
    pub end: f64,
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl WordSegment {
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

/// The canonical output of a transcription adapter, and the input/output
/// of the diarization fusion and multi-track merge steps.
///
/// Invariants (validated in [`Self::validate`], not enforced at construction
/// since adapters build these incrementally):
/// - every segment's `end >= start`
/// - `word_segments` ordered by `start`
/// - `text` equals the space-joined, trimmed segment texts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub segments: Vec<Segment>,
    pub word_segments: Vec<WordSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub text: String,
}

impl TranscriptResult {
    /// Rebuild `text` from `segments`, per the §3 invariant.
    pub fn rebuild_text(&mut self) {
        self.text = self
            .segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
    }

    pub fn validate(&self) -> Result<(), String> {
        for (i, seg) in self.segments.iter().enumerate() {
            if seg.end < seg.start {
                return Err(format!("segment {i}: end {} < start {}", seg.end, seg.start));
            }
        }
        for pair in self.word_segments.windows(2) {
            if pair[1].start < pair[0].start {
                return Err("word_segments not ordered by start".into());
            }
        }
        let expected = self
            .segments
            .iter()
            .map(|s| s.text.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if self.text != expected {
            return Err("text does not match joined segment texts".into());
        }
        Ok(())
    }
}

/// A diarization-only span: who was speaking, independent of what was said.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiarizationSegment {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Output of a diarization adapter: the speaker turns and the distinct
/// speaker labels observed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiarizationResult {
    pub segments: Vec<DiarizationSegment>,
    pub speakers: Vec<String>,
}
