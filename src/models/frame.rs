use serde::{Deserialize, Deserializer, Serialize};

/// A spelling error as reported by the vision model for one frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportedError {
    #[serde(default, deserialize_with = "null_as_default")]
    pub word: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Structured reply the vision model is asked to produce.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VisionReply {
    #[serde(default)]
    pub text: Option<String>,
    /// Entries that are not error objects are dropped; the text survives.
    #[serde(default, deserialize_with = "lenient_errors")]
    pub errors: Vec<ReportedError>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_errors<'de, D>(deserializer: D) -> Result<Vec<ReportedError>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(raw
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

impl VisionReply {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// What was read off one sampled frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameReading {
    /// 1-based position in the sampled sequence
    pub frame_index: usize,
    pub timestamp_sec: u64,
    pub text: Option<String>,
    pub errors: Vec<ReportedError>,
}

impl FrameReading {
    /// On-screen text, ignoring blanks and the literal "null"/"none" some
    /// models emit instead of a JSON null.
    pub fn visible_text(&self) -> Option<&str> {
        let text = self.text.as_deref()?.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("none")
        {
            return None;
        }
        Some(text)
    }
}

/// A misspelling aggregated across a job, first occurrence wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpellingError {
    pub word: String,
    pub suggestion: String,
    pub context: String,
    pub timestamp_sec: u64,
    pub timestamp: String,
}

/// Seconds into the video for a 1-based frame index at `frame_rate` frames/sec.
pub fn frame_timestamp(frame_index: usize, frame_rate: f64) -> u64 {
    (frame_index as f64 / frame_rate).round().max(0.0) as u64
}

/// `m:ss`, minutes unpadded.
pub fn format_timestamp(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
