//! Text tokenization and stop-word filtering.

pub mod stopwords;
pub mod tokenize;

pub use stopwords::StopWords;
pub use tokenize::{tokenize, TokenFilter};
