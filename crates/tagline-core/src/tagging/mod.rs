//! Candidate tag extraction from caption sets.

pub mod extract;

pub use extract::TagExtractor;
