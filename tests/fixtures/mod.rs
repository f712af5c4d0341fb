//! Canned model replies and transcripts for pipeline tests

#![allow(dead_code)]

use caption_audit::models::caption::SpokenSegment;

/// Leading bytes of a JPEG file, enough for format sniffing.
pub const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0";

/// Frame 1 (0:02): a headline with one real misspelling and one false positive.
pub const FRAME_1_REPLY: &str = r#"```json
{"text": "Welcom to the action", "errors": [{"word": "Welcom", "suggestion": "Welcome"}, {"word": "action", "suggestion": "actions"}]}
```"#;

/// Frame 2 (0:04): the same misspelling again, different case.
pub const FRAME_2_REPLY: &str = r#"{"text": "WELCOM back", "errors": [{"word": "WELCOM", "suggestion": "WELCOME"}]}"#;

/// Frame 3 (0:06): the model parroted its prompt.
pub const FRAME_3_REPLY: &str = r#"{"text": "You are a spell-checker. Reply in JSON.", "errors": [{"word": "spel", "suggestion": "spell"}]}"#;

/// Frame 4 (0:08): not JSON at all.
pub const FRAME_4_REPLY: &str = "I cannot read this image.";

/// Frame 5 (0:10): a caption for the second spoken segment.
pub const FRAME_5_REPLY: &str = r#"Sure: {"text": "thanks for watching", "errors": []}"#;

pub fn dictionary_words() -> Vec<&'static str> {
    vec!["welcome", "to", "the", "action", "back", "thanks", "for", "watching"]
}

pub fn spoken_segments() -> Vec<SpokenSegment> {
    vec![
        SpokenSegment {
            start: 1.0,
            end: 3.0,
            text: "welcome to the action".to_string(),
        },
        SpokenSegment {
            start: 9.5,
            end: 10.5,
            text: "Thanks for watching".to_string(),
        },
        SpokenSegment {
            start: 30.0,
            end: 32.0,
            text: "see you next time".to_string(),
        },
    ]
}
