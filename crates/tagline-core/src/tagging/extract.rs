//! Caption-to-tag reduction.
//!
//! Every caption is tokenized and filtered independently; the resulting
//! token sets are unioned. Caption order does not affect the result.

use crate::text::{StopWords, TokenFilter};
use crate::types::TagSet;

/// Reduces a family of captions to a deduplicated candidate-tag set.
#[derive(Debug, Clone)]
pub struct TagExtractor {
    filter: TokenFilter,
}

impl TagExtractor {
    pub fn new(stopwords: StopWords) -> Self {
        Self {
            filter: TokenFilter::new(stopwords),
        }
    }

    /// Union of the non-stop-word tokens of every caption.
    ///
    /// Accepts any number of captions, including none.
    pub fn extract<I, S>(&self, captions: I) -> TagSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = TagSet::new();
        for caption in captions {
            tags.extend(self.filter.tokens(caption.as_ref()));
        }
        tags
    }
}
