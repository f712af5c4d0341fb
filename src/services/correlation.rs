//! Caption accuracy: spoken segments compared against concurrent on-screen text.

use strsim::normalized_levenshtein;

use crate::config::AnalysisSettings;
use crate::models::caption::{AccuracyRow, CaptionStatus, SpokenSegment, NO_ON_SCREEN_TEXT};
use crate::models::frame::{format_timestamp, FrameReading};
use crate::models::language::ContentLanguage;

/// Separator between distinct on-screen texts inside one window.
const ON_SCREEN_SEPARATOR: &str = " | ";

/// Build one accuracy row per spoken segment.
///
/// English rows are scored by fuzzy similarity; romanized rows are always
/// left for human review with no score.
pub fn correlate(
    frames: &[FrameReading],
    segments: &[SpokenSegment],
    language: ContentLanguage,
    settings: &AnalysisSettings,
) -> Vec<AccuracyRow> {
    segments
        .iter()
        .filter_map(|segment| {
            let spoken = segment.text.trim();
            if spoken.is_empty() {
                return None;
            }

            let on_screen = on_screen_text(frames, segment, settings.correlation_slack_secs);
            let (status, score) = if language.is_scored() {
                score_row(spoken, &on_screen, settings)
            } else {
                (CaptionStatus::Review, None)
            };

            Some(AccuracyRow {
                timestamp: format_timestamp(segment.start.max(0.0).floor() as u64),
                spoken: spoken.to_string(),
                on_screen: if on_screen.is_empty() {
                    NO_ON_SCREEN_TEXT.to_string()
                } else {
                    on_screen
                },
                status,
                score,
            })
        })
        .collect()
}

/// Whether a frame at `timestamp_sec` counts as concurrent with `segment`.
pub fn within_window(segment: &SpokenSegment, timestamp_sec: f64, slack_secs: f64) -> bool {
    segment.start - slack_secs <= timestamp_sec && timestamp_sec <= segment.end + slack_secs
}

/// Distinct on-screen texts inside the window, first-seen order.
fn on_screen_text(frames: &[FrameReading], segment: &SpokenSegment, slack_secs: f64) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for frame in frames {
        if !within_window(segment, frame.timestamp_sec as f64, slack_secs) {
            continue;
        }
        if let Some(text) = frame.visible_text() {
            if !parts.contains(&text) {
                parts.push(text);
            }
        }
    }
    parts.join(ON_SCREEN_SEPARATOR)
}

fn score_row(spoken: &str, on_screen: &str, settings: &AnalysisSettings) -> (CaptionStatus, Option<u8>) {
    if on_screen.is_empty() {
        return (CaptionStatus::NoCaption, Some(0));
    }
    let ratio = similarity(spoken, on_screen);
    (classify(ratio, settings), Some((ratio * 100.0).round() as u8))
}

/// Case-insensitive whole-string similarity in 0.0..=1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

/// Map a similarity ratio onto match / partial / mismatch.
pub fn classify(ratio: f64, settings: &AnalysisSettings) -> CaptionStatus {
    if ratio >= settings.match_threshold {
        CaptionStatus::Match
    } else if ratio >= settings.partial_threshold {
        CaptionStatus::Partial
    } else {
        CaptionStatus::Mismatch
    }
}
