//! Tokenizers that split text into terms.
//!
//! # Examples
//!
//! ```
//! use fast_bayes::text::{Tokenizer, UnicodeWordTokenizer};
//!
//! let tokenizer = UnicodeWordTokenizer::new();
//! let terms = tokenizer.tokenize("Hello, world! café");
//! assert_eq!(terms, vec!["hello", "world", "café"]);
//! ```

use unicode_segmentation::UnicodeSegmentation;

/// Trait for tokenizers that convert text into terms.
///
/// The trait requires `Send + Sync` so a tokenizer can sit inside a shared
/// classifier.
pub trait Tokenizer: Send + Sync {
    /// Split `text` into terms.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Splits on Unicode word boundaries (UAX #29) and lowercases.
///
/// Punctuation and whitespace segments are dropped.
#[derive(Clone, Debug, Default)]
pub struct UnicodeWordTokenizer;

impl UnicodeWordTokenizer {
    /// Create a new Unicode word tokenizer.
    pub fn new() -> Self {
        UnicodeWordTokenizer
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words().map(|word| word.to_lowercase()).collect()
    }

    fn name(&self) -> &'static str {
        "unicode_word"
    }
}

/// Splits on whitespace only, keeping punctuation and case.
#[derive(Clone, Debug, Default)]
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
    /// Create a new whitespace tokenizer.
    pub fn new() -> Self {
        WhitespaceTokenizer
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn name(&self) -> &'static str {
        "whitespace"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_word_tokenizer() {
        let tokenizer = UnicodeWordTokenizer::new();
        let terms = tokenizer.tokenize("Buy NOW!!! Limited-time offer, 50% off.");
        assert_eq!(terms, vec!["buy", "now", "limited", "time", "offer", "50", "off"]);
        assert_eq!(tokenizer.name(), "unicode_word");
    }

    #[test]
    fn test_whitespace_tokenizer() {
        let tokenizer = WhitespaceTokenizer::new();
        let terms = tokenizer.tokenize("  Hello   World!\tagain ");
        assert_eq!(terms, vec!["Hello", "World!", "again"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(UnicodeWordTokenizer::new().tokenize("  ,.; ").is_empty());
        assert!(WhitespaceTokenizer::new().tokenize("").is_empty());
    }
}
