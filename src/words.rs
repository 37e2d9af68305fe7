use std::collections::HashSet;

use crate::models::DetectedWord;

/// Distinct words in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordList {
    words: Vec<DetectedWord>,
}

impl WordList {
    /// Drop regions that produced no word and keep the first occurrence of
    /// every other word.
    pub fn aggregate<I>(words: I) -> Self
    where
        I: IntoIterator<Item = Option<DetectedWord>>,
    {
        let mut seen = HashSet::new();
        let words = words
            .into_iter()
            .flatten()
            .filter(|word| seen.insert(word.clone()))
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectedWord> {
        self.words.iter()
    }
}

impl IntoIterator for WordList {
    type Item = DetectedWord;
    type IntoIter = std::vec::IntoIter<DetectedWord>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.into_iter()
    }
}

impl<'a> IntoIterator for &'a WordList {
    type Item = &'a DetectedWord;
    type IntoIter = std::slice::Iter<'a, DetectedWord>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}
