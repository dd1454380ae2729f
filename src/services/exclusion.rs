// src/services/exclusion.rs

//! Title exclusion filter.

use crate::models::ExcludedWord;

/// Case-insensitive substring filter over video titles.
///
/// Built once per ingestion cycle from the current word list; it is never
/// mutated while a cycle runs.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    words: Vec<String>,
}

impl ExclusionFilter {
    /// Build a filter from raw words. Blank words are ignored.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Build a filter from stored excluded words.
    pub fn from_words(words: &[ExcludedWord]) -> Self {
        Self::new(words.iter().map(|w| w.word.as_str()))
    }

    /// First excluded word contained in `title`, if any.
    pub fn matched_word(&self, title: &str) -> Option<&str> {
        if self.words.is_empty() {
            return None;
        }
        let title = title.to_lowercase();
        self.words
            .iter()
            .find(|w| title.contains(w.as_str()))
            .map(String::as_str)
    }

    /// Whether `title` contains any excluded word.
    pub fn is_excluded(&self, title: &str) -> bool {
        self.matched_word(title).is_some()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
