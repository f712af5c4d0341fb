use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Language the video's speech and captions are written in.
///
/// `Hinglish` is romanized Hindi: spoken Hindi, captions in Latin script.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentLanguage {
    #[default]
    #[strum(to_string = "english", serialize = "plain")]
    English,
    #[strum(to_string = "hinglish", serialize = "romanized")]
    Hinglish,
}

impl ContentLanguage {
    /// Decoding hint handed to the speech recognizer (ISO 639-1).
    pub fn speech_language(self) -> &'static str {
        match self {
            ContentLanguage::English => "en",
            ContentLanguage::Hinglish => "hi",
        }
    }

    /// Whether spoken and on-screen text share a script closely enough to score.
    pub fn is_scored(self) -> bool {
        matches!(self, ContentLanguage::English)
    }

    /// Dictionary lookups only make sense for English orthography.
    pub fn uses_dictionary(self) -> bool {
        matches!(self, ContentLanguage::English)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(ContentLanguage::from_str("english").unwrap(), ContentLanguage::English);
        assert_eq!(ContentLanguage::from_str("Plain").unwrap(), ContentLanguage::English);
        assert_eq!(ContentLanguage::from_str("HINGLISH").unwrap(), ContentLanguage::Hinglish);
        assert_eq!(ContentLanguage::from_str("romanized").unwrap(), ContentLanguage::Hinglish);
        assert!(ContentLanguage::from_str("klingon").is_err());
    }

    #[test]
    fn test_display_and_serde_agree() {
        assert_eq!(ContentLanguage::Hinglish.to_string(), "hinglish");
        assert_eq!(
            serde_json::to_value(ContentLanguage::Hinglish).unwrap(),
            serde_json::json!("hinglish")
        );
    }

    #[test]
    fn test_speech_hint() {
        assert_eq!(ContentLanguage::English.speech_language(), "en");
        assert_eq!(ContentLanguage::Hinglish.speech_language(), "hi");
    }
}
