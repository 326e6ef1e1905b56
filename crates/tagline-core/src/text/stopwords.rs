//! Stop-word lists.
//!
//! The built-in English list is embedded at compile time. Lookups are
//! case-sensitive: "The" is not a stop-word even though "the" is.

use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

const ENGLISH: &str = include_str!("../../data/english_stopwords.txt");

/// An immutable set of words excluded from tag candidates.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// Built-in list for a language.
    pub fn for_language(language: &str) -> Result<Self, ConfigError> {
        match language.to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Self::parse(ENGLISH)),
            other => Err(ConfigError::ValidationError(format!(
                "No built-in stop-word list for language {other:?}"
            ))),
        }
    }

    /// Whether [`StopWords::for_language`] knows this language.
    pub fn is_supported(language: &str) -> bool {
        matches!(language.to_ascii_lowercase().as_str(), "english" | "en")
    }

    /// Load a newline-delimited list. Blank lines and `#` comments are skipped.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let words = Self::parse(&content);
        tracing::debug!("Loaded {} stop-words from {:?}", words.len(), path);
        Ok(words)
    }

    /// Build from an explicit word list.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    fn parse(content: &str) -> Self {
        Self::from_words(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Case-sensitive membership test.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
