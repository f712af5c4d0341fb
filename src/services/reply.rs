//! Defensive parsing of free-form vision model replies.

use tracing::debug;

use crate::models::frame::VisionReply;

/// Phrases from the prompt that show up when a model parrots its
/// instructions instead of reading the image.
pub const ECHO_MARKERS: &[&str] = &[
    "spell-checker",
    "spell checker",
    "video frame",
    "json object",
    "no explanation",
    "no markdown",
    "reply with",
    "reply in json",
    "look at this",
    "lower thirds",
    "graphics, etc",
    "you are a",
    "on-screen text",
    "misspelled",
    "surrounding words",
];

/// Two or more markers in the extracted text means the reply is an echo.
const ECHO_MARKER_LIMIT: usize = 2;

/// Parse a raw model reply into a [`VisionReply`].
///
/// Anything unusable, including an echoed prompt, becomes an empty reply.
pub fn parse_reply(raw: &str) -> VisionReply {
    let body = strip_code_fence(raw.trim());
    let Some(object) = extract_json_object(body) else {
        debug!(reply_len = raw.len(), "No JSON object in model reply");
        return VisionReply::empty();
    };

    let reply: VisionReply = match serde_json::from_str(object) {
        Ok(reply) => reply,
        Err(e) => {
            debug!(error = %e, "Model reply is not a valid reply object");
            return VisionReply::empty();
        }
    };

    if reply.text.as_deref().is_some_and(is_echo) {
        debug!("Model echoed its prompt, discarding reply");
        return VisionReply::empty();
    }

    reply
}

/// Whether `text` looks like the model repeating its instructions.
pub fn is_echo(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ECHO_MARKERS
        .iter()
        .filter(|marker| lowered.contains(*marker))
        .count()
        >= ECHO_MARKER_LIMIT
}

/// Remove a surrounding ```json ... ``` fence if present.
fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    rest.strip_suffix("```").unwrap_or(rest).trim_end()
}

/// Locate the first balanced top-level `{...}` span.
///
/// Braces inside JSON string literals are ignored, so a `}` in a caption
/// cannot end the object early.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let reply = parse_reply(r#"{"text": "Breaking News", "errors": []}"#);
        assert_eq!(reply.text.as_deref(), Some("Breaking News"));
        assert!(reply.errors.is_empty());
    }

    #[test]
    fn test_null_errors_keep_text() {
        let reply = parse_reply(r#"{"text": "Breaking News", "errors": null}"#);
        assert_eq!(reply.text.as_deref(), Some("Breaking News"));
        assert!(reply.errors.is_empty());

        let reply = parse_reply(r#"{"text": "Breking News", "errors": [{"word": null}, {"word": "Breking", "suggestion": "Breaking"}]}"#);
        assert_eq!(reply.text.as_deref(), Some("Breking News"));
        assert_eq!(reply.errors.len(), 2);
        assert_eq!(reply.errors[1].suggestion, "Breaking");
    }

    #[test]
    fn test_code_fence_stripped() {
        let raw = "```json\n{\"text\": \"Welcom\", \"errors\": [{\"word\": \"Welcom\", \"suggestion\": \"Welcome\"}]}\n```";
        let reply = parse_reply(raw);
        assert_eq!(reply.text.as_deref(), Some("Welcom"));
        assert_eq!(reply.errors.len(), 1);
        assert_eq!(reply.errors[0].suggestion, "Welcome");
    }

    #[test]
    fn test_prose_around_object() {
        let raw = "Sure! Here you go: {\"text\": null, \"errors\": []} Hope that helps {not json}";
        let reply = parse_reply(raw);
        assert_eq!(reply, VisionReply::empty());
    }

    #[test]
    fn test_first_of_multiple_objects() {
        let raw = r#"{"text": "first", "errors": []} and {"text": "second", "errors": []}"#;
        assert_eq!(parse_reply(raw).text.as_deref(), Some("first"));
    }

    #[test]
    fn test_braces_inside_strings() {
        let raw = r#"{"text": "price {was} \"}\" high", "errors": []}"#;
        assert_eq!(extract_json_object(raw), Some(raw));
        assert_eq!(parse_reply(raw).text.as_deref(), Some("price {was} \"}\" high"));
    }

    #[test]
    fn test_nested_objects() {
        let raw = r#"x {"text": "a", "errors": [{"word": "teh", "suggestion": "the"}]} y"#;
        let object = extract_json_object(raw).unwrap();
        assert!(object.starts_with('{') && object.ends_with('}'));
        assert_eq!(parse_reply(raw).errors[0].word, "teh");
    }

    #[test]
    fn test_malformed_falls_back_to_empty() {
        assert_eq!(parse_reply(""), VisionReply::empty());
        assert_eq!(parse_reply("no json here"), VisionReply::empty());
        assert_eq!(parse_reply(r#"{"text": "unterminated"#), VisionReply::empty());
        assert_eq!(parse_reply(r#"{"text": 42}"#), VisionReply::empty());
    }

    #[test]
    fn test_echo_two_markers_discarded() {
        let raw = r#"{"text": "Reply in JSON with the on-screen text", "errors": [{"word": "x", "suggestion": "y"}]}"#;
        assert_eq!(parse_reply(raw), VisionReply::empty());
    }

    #[test]
    fn test_echo_single_marker_kept() {
        let raw = r#"{"text": "Please reply in json", "errors": []}"#;
        assert_eq!(parse_reply(raw).text.as_deref(), Some("Please reply in json"));
    }

    #[test]
    fn test_is_echo() {
        assert!(is_echo("You are a spell checker"));
        assert!(!is_echo("You are a star"));
        assert!(!is_echo(""));
    }
}
