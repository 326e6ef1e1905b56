//! Word tokenization and stop-word filtering.
//!
//! A token is a maximal run of word characters (alphanumeric or `_`).
//! Everything else separates tokens and is discarded.

use std::collections::BTreeSet;

use super::StopWords;

/// Unicode alphanumeric or `_`.
///
/// Broader than a regex `\w` for combining vowel signs (e.g. U+093E), which
/// count as alphabetic here and so stay attached to their word. ASCII and
/// Latin text tokenize the same either way.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split text into word tokens, in order of appearance.
///
/// Never yields empty tokens; an empty or punctuation-only string yields none.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|token| !token.is_empty())
}

/// Tokenizes text and drops stop-words.
#[derive(Debug, Clone)]
pub struct TokenFilter {
    stopwords: StopWords,
}

impl TokenFilter {
    pub fn new(stopwords: StopWords) -> Self {
        Self { stopwords }
    }

    /// The set of non-stop-word tokens in `text`.
    pub fn tokens(&self, text: &str) -> BTreeSet<String> {
        tokenize(text)
            .filter(|token| !self.stopwords.contains(token))
            .map(str::to_string)
            .collect()
    }

    pub fn stopwords(&self) -> &StopWords {
        &self.stopwords
    }
}
