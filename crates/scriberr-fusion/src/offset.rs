//! Offset estimation between a transcript's word timeline and a
//! diarization's speaker timeline — the clocks commonly drift a few hundred
//! milliseconds relative to each other when the two came from different
//! passes over the audio.

use scriberr_types::{DiarizationSegment, WordSegment};

const SWEEP_MIN: f64 = -2.0;
const SWEEP_MAX: f64 = 2.0;
const SWEEP_STEP: f64 = 0.05;

fn coverage(words: &[WordSegment], segments: &[DiarizationSegment], delta: f64) -> usize {
    words
        .iter()
        .filter(|w| {
            let midpoint = w.midpoint() + delta;
            segments.iter().any(|s| midpoint >= s.start && midpoint <= s.end)
        })
        .count()
}

/// Sweep candidate offsets and return the one with the best coverage gain
/// over `delta = 0`, rounded to 3 decimal places. Returns `0.0` outright if
/// there are no words to score against (callers should not call this in
/// that case, but it degenerates safely).
///
/// Open question preserved as-is: coverage count is the only signal used —
/// there is no secondary tie-break metric when two non-zero deltas tie.
/// The first one encountered by the sweep (lowest delta) wins, matching a
/// stable `max_by_key` over an ascending iteration order.
pub fn estimate_offset(words: &[WordSegment], segments: &[DiarizationSegment]) -> f64 {
    if words.is_empty() || segments.is_empty() {
        return 0.0;
    }

    let baseline = coverage(words, segments, 0.0);
    let threshold = (words.len() as f64 * 0.05).max(2.0) as usize;

    let mut best_delta = 0.0;
    let mut best_coverage = baseline;

    let steps = ((SWEEP_MAX - SWEEP_MIN) / SWEEP_STEP).round() as i64;
    for i in 0..=steps {
        let delta = SWEEP_MIN + i as f64 * SWEEP_STEP;
        let c = coverage(words, segments, delta);
        if c > best_coverage {
            best_coverage = c;
            best_delta = delta;
        }
    }

    if best_coverage >= baseline + threshold {
        round3(best_delta)
    } else {
        0.0
    }
}

/// Shift a copy of `segments` by `delta` seconds. Never mutates the input.
pub fn shift_segments(segments: &[DiarizationSegment], delta: f64) -> Vec<DiarizationSegment> {
    segments
        .iter()
        .map(|s| DiarizationSegment {
            start: s.start + delta,
            end: s.end + delta,
            speaker: s.speaker.clone(),
            confidence: s.confidence,
        })
        .collect()
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
