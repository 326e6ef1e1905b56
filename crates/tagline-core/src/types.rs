//! Core data types for the caption-to-tag pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One natural-language description of an image.
pub type Caption = String;

/// Captions whose elements are pairwise distinct, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionSet {
    captions: Vec<Caption>,
}

impl CaptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a caption unless an identical string is already present.
    ///
    /// Returns whether the caption was added.
    pub fn insert(&mut self, caption: Caption) -> bool {
        if self.captions.contains(&caption) {
            return false;
        }
        self.captions.push(caption);
        true
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Caption> {
        self.captions.iter()
    }

    pub fn as_slice(&self) -> &[Caption] {
        &self.captions
    }

    pub fn into_vec(self) -> Vec<Caption> {
        self.captions
    }
}

impl<'a> IntoIterator for &'a CaptionSet {
    type Item = &'a Caption;
    type IntoIter = std::slice::Iter<'a, Caption>;

    fn into_iter(self) -> Self::IntoIter {
        self.captions.iter()
    }
}

/// Deduplicated candidate tags with no stop-words and no non-word characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: BTreeSet<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Materialize the set into the single ordering used for scoring.
    pub fn into_ordered(self) -> Vec<String> {
        self.tags.into_iter().collect()
    }
}

impl Extend<String> for TagSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.tags.extend(iter);
    }
}

impl FromIterator<String> for TagSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

/// A candidate tag paired with its zero-shot probability.
///
/// Serializes as a two-element array: `["dog", 0.42]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTag(pub String, pub f32);

impl ScoredTag {
    pub fn new(tag: impl Into<String>, score: f32) -> Self {
        Self(tag.into(), score)
    }

    pub fn tag(&self) -> &str {
        &self.0
    }

    pub fn score(&self) -> f32 {
        self.1
    }
}

/// The response payload for one tagged image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagReport {
    /// Every candidate tag with its probability, in scoring order
    pub tags: Vec<ScoredTag>,

    /// The single deterministic best caption
    pub captions: Vec<Caption>,

    /// Sampled captions followed by the best caption
    pub english_cap: Vec<Caption>,
}
