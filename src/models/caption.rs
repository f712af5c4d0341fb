use serde::{Deserialize, Serialize};

/// A stretch of recognized speech.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpokenSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Verdict on how well on-screen text tracks the speech.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStatus {
    Match,
    Partial,
    Mismatch,
    /// Speech occurred but nothing was on screen.
    NoCaption,
    /// Left to a human; scripts differ too much to score.
    Review,
}

/// Placeholder shown when no on-screen text was seen for a segment.
pub const NO_ON_SCREEN_TEXT: &str = "—";

/// One spoken segment compared against concurrent on-screen text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccuracyRow {
    pub timestamp: String,
    pub spoken: String,
    pub on_screen: String,
    pub status: CaptionStatus,
    pub score: Option<u8>,
}
