//! Rebuild transcript segments from a flat, speaker-annotated word list.

use scriberr_types::{Segment, WordSegment};

const SILENCE_GAP_SECONDS: f64 = 1.0;

/// Walk `words` in order, starting a new segment whenever the speaker
/// changes or the gap since the previous word exceeds
/// [`SILENCE_GAP_SECONDS`]. Each emitted segment spans its first word's
/// start to its last word's end, with `text` the space-joined words.
pub fn rebuild_segments_from_words(words: &[WordSegment]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Vec<&WordSegment> = Vec::new();

    for word in words {
        if let Some(prev) = current.last() {
            let speaker_changed = prev.speaker != word.speaker;
            let silence = word.start - prev.end;
            if speaker_changed || silence > SILENCE_GAP_SECONDS {
                segments.push(flush(&current));
                current.clear();
            }
        }
        current.push(word);
    }
    if !current.is_empty() {
        segments.push(flush(&current));
    }

    segments
}

fn flush(words: &[&WordSegment]) -> Segment {
    let text = words
        .iter()
        .map(|w| w.word.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Segment {
        start: words.first().map(|w| w.start).unwrap_or(0.0),
        end: words.last().map(|w| w.end).unwrap_or(0.0),
        text,
        speaker: words.first().and_then(|w| w.speaker.clone()),
    }
}
