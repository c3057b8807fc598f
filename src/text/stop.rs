//! Stop word lists.
//!
//! Stop words are terms too common to tell classes apart; they are removed
//! before counting.

use ahash::AHashSet;

/// Default English stop words list.
const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// A set of terms to drop.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: AHashSet<String>,
}

impl StopWords {
    /// The default English list.
    pub fn english() -> Self {
        Self::from_words(DEFAULT_ENGLISH_STOP_WORDS.iter().copied())
    }

    /// An empty list: nothing is dropped.
    pub fn none() -> Self {
        Self::default()
    }

    /// A custom list. Words are matched case-sensitively as given.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopWords {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `term` is a stop word.
    pub fn contains(&self, term: &str) -> bool {
        self.words.contains(term)
    }

    /// Number of stop words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_list() {
        let stop = StopWords::english();
        assert!(stop.contains("the"));
        assert!(stop.contains("with"));
        assert!(!stop.contains("viagra"));
        assert_eq!(stop.len(), DEFAULT_ENGLISH_STOP_WORDS.len());
    }

    #[test]
    fn test_custom_list() {
        let stop = StopWords::from_words(["foo", "bar"]);
        assert!(stop.contains("foo"));
        assert!(!stop.contains("the"));
        assert!(StopWords::none().is_empty());
    }
}
