//! English word list used to confirm model-reported misspellings.

use std::collections::HashSet;
use std::path::Path;

use crate::models::frame::ReportedError;

/// Word lookup used to cross-check misspellings reported by the vision model.
pub trait Dictionary: Send + Sync {
    /// `word` is already lower-cased and stripped to letters.
    fn is_known(&self, word: &str) -> bool;
}

/// Dictionary backed by a newline-separated word list.
#[derive(Debug, Default)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    pub fn from_path(path: &Path) -> Result<Self, DictionaryError> {
        let contents = std::fs::read_to_string(path).map_err(|source| DictionaryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let list = Self::from_words(contents.lines());
        if list.is_empty() {
            return Err(DictionaryError::Empty(path.display().to_string()));
        }
        Ok(list)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| normalize_word(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordList {
    fn is_known(&self, word: &str) -> bool {
        self.words.contains(word)
    }
}

/// Lower-case and drop everything that is not an ASCII letter.
pub fn normalize_word(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Keep only errors whose word the dictionary does not know.
pub fn confirm_errors(errors: Vec<ReportedError>, dictionary: &dyn Dictionary) -> Vec<ReportedError> {
    errors
        .into_iter()
        .filter(|err| {
            let word = normalize_word(&err.word);
            !word.is_empty() && !dictionary.is_known(&word)
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("Failed to read word list {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Word list {0} contains no words")]
    Empty(String),
}
