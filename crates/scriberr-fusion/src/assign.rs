//! Word-to-speaker assignment by temporal overlap against a (possibly
//! shifted) diarization timeline.

use scriberr_types::{DiarizationSegment, Segment, WordSegment};

const NEAREST_GAP_TOLERANCE: f64 = 0.2;

fn overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

fn gap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    if a_end < b_start {
        b_start - a_end
    } else if b_end < a_start {
        a_start - b_end
    } else {
        0.0
    }
}

/// Pick the speaker for `[start, end]` against `segments`, scanned in
/// input order so ties go to the first-scanned segment. Falls back to the
/// nearest segment within [`NEAREST_GAP_TOLERANCE`] when there is no
/// overlap with anything.
fn assign_one(start: f64, end: f64, segments: &[DiarizationSegment]) -> Option<String> {
    let mut best_overlap = 0.0;
    let mut best_speaker: Option<&str> = None;

    for s in segments {
        let o = overlap(start, end, s.start, s.end);
        if o > best_overlap {
            best_overlap = o;
            best_speaker = Some(&s.speaker);
        }
    }

    if let Some(speaker) = best_speaker {
        return Some(speaker.to_string());
    }

    let mut nearest: Option<(&str, f64)> = None;
    for s in segments {
        let g = gap(start, end, s.start, s.end);
        if g <= NEAREST_GAP_TOLERANCE {
            if nearest.map(|(_, best)| g < best).unwrap_or(true) {
                nearest = Some((&s.speaker, g));
            }
        }
    }

    nearest.map(|(speaker, _)| speaker.to_string())
}

/// Assign a speaker to every word, in place semantics via a fresh `Vec`.
pub fn assign_words(words: &[WordSegment], segments: &[DiarizationSegment]) -> Vec<WordSegment> {
    words
        .iter()
        .map(|w| WordSegment {
            speaker: assign_one(w.start, w.end, segments),
            ..w.clone()
        })
        .collect()
}

/// Assign a speaker directly to transcript segments (used when there are
/// no word-level timestamps to fuse against).
pub fn assign_segments(segments_in: &[Segment], diarization: &[DiarizationSegment]) -> Vec<Segment> {
    segments_in
        .iter()
        .map(|s| Segment {
            speaker: assign_one(s.start, s.end, diarization),
            ..s.clone()
        })
        .collect()
}
