//! Document classifier over term counts.

use ahash::AHashMap;

use crate::classifier::NaiveBayes;
use crate::config::ClassifierConfig;
use crate::error::{BayesError, Result};
use crate::predictor::Ranking;
use crate::text::stop::StopWords;
use crate::text::tokenizer::{Tokenizer, UnicodeWordTokenizer};

/// Classifies raw text with a term-keyed [`NaiveBayes`].
///
/// `observe` trains one document, `classify` returns the best label. The
/// model is rebuilt lazily on the first classification after training.
///
/// # Examples
///
/// ```
/// use fast_bayes::text::TextClassifier;
///
/// let classifier = TextClassifier::english().unwrap();
/// classifier.observe("cheap pills buy now", "spam").unwrap();
/// classifier.observe("meeting notes for the project", "ham").unwrap();
///
/// assert_eq!(classifier.classify("buy cheap pills").unwrap(), "spam");
/// ```
pub struct TextClassifier {
    tokenizer: Box<dyn Tokenizer>,
    stop_words: StopWords,
    classifier: NaiveBayes<String, String>,
}

impl std::fmt::Debug for TextClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextClassifier")
            .field("tokenizer", &self.tokenizer.name())
            .field("stop_words", &self.stop_words.len())
            .field("classifier", &self.classifier)
            .finish()
    }
}

impl TextClassifier {
    /// Unicode word tokenizing, English stop words, default configuration.
    pub fn english() -> Result<Self> {
        Self::new(
            ClassifierConfig::default(),
            Box::new(UnicodeWordTokenizer::new()),
            StopWords::english(),
        )
    }

    /// Create a text classifier from its parts.
    pub fn new(
        config: ClassifierConfig,
        tokenizer: Box<dyn Tokenizer>,
        stop_words: StopWords,
    ) -> Result<Self> {
        Ok(TextClassifier {
            tokenizer,
            stop_words,
            classifier: NaiveBayes::new(config)?,
        })
    }

    /// Wrap an existing term-keyed classifier, e.g. one restored from disk.
    pub fn from_classifier(
        classifier: NaiveBayes<String, String>,
        tokenizer: Box<dyn Tokenizer>,
        stop_words: StopWords,
    ) -> Self {
        TextClassifier {
            tokenizer,
            stop_words,
            classifier,
        }
    }

    /// The underlying classifier.
    pub fn classifier(&self) -> &NaiveBayes<String, String> {
        &self.classifier
    }

    /// Term counts of `text` after stop word removal, in first-seen order.
    pub fn term_counts(&self, text: &str) -> Vec<(String, f64)> {
        let mut positions: AHashMap<String, usize> = AHashMap::new();
        let mut counts: Vec<(String, f64)> = Vec::new();
        for term in self.tokenizer.tokenize(text) {
            if self.stop_words.contains(&term) {
                continue;
            }
            match positions.get(&term) {
                Some(&pos) => counts[pos].1 += 1.0,
                None => {
                    positions.insert(term.clone(), counts.len());
                    counts.push((term, 1.0));
                }
            }
        }
        counts
    }

    /// Train `text` as one sample of `label`.
    pub fn observe(&self, text: &str, label: &str) -> Result<()> {
        self.observe_weighted(text, label, 1)
    }

    /// Train `text` as `multiplicity` identical samples of `label`.
    pub fn observe_weighted(&self, text: &str, label: &str, multiplicity: u64) -> Result<()> {
        let counts = self.term_counts(text);
        self.classifier.train(
            label,
            counts.iter().map(|(term, n)| (term.as_str(), *n)),
            multiplicity,
        )
    }

    /// Rank every label for `text`.
    pub fn rank(&self, text: &str) -> Result<Ranking<String>> {
        self.classifier.refresh()?;
        let counts = self.term_counts(text);
        self.classifier
            .classify(counts.iter().map(|(term, n)| (term.as_str(), *n)))
    }

    /// The best label for `text`.
    pub fn classify(&self, text: &str) -> Result<String> {
        self.rank(text)?
            .into_entries()
            .into_iter()
            .next()
            .map(|entry| entry.label)
            .ok_or(BayesError::EmptyTrainingSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenizer::WhitespaceTokenizer;

    #[test]
    fn test_term_counts_drop_stop_words() {
        let classifier = TextClassifier::english().unwrap();
        let counts = classifier.term_counts("The offer is the best offer");
        assert_eq!(
            counts,
            vec![("offer".to_string(), 2.0), ("best".to_string(), 1.0)]
        );
    }

    #[test]
    fn test_observe_and_classify() {
        let classifier = TextClassifier::english().unwrap();
        classifier.observe("win money now, free money", "spam").unwrap();
        classifier.observe("claim your free prize", "spam").unwrap();
        classifier.observe("lunch with the team tomorrow", "ham").unwrap();
        classifier.observe("project review meeting notes", "ham").unwrap();

        assert_eq!(classifier.classify("free money prize").unwrap(), "spam");
        assert_eq!(classifier.classify("team meeting tomorrow").unwrap(), "ham");

        let ranking = classifier.rank("free lunch").unwrap();
        assert_eq!(ranking.len(), 2);
    }

    #[test]
    fn test_observe_weighted_counts_samples() {
        let classifier = TextClassifier::english().unwrap();
        classifier.observe_weighted("free offer", "spam", 3).unwrap();
        assert_eq!(classifier.classifier().statistics().total_samples(), 3);
        assert!(matches!(
            classifier.observe_weighted("free offer", "spam", 0),
            Err(BayesError::InvalidObservation(_))
        ));
    }

    #[test]
    fn test_classify_before_training_fails() {
        let classifier = TextClassifier::english().unwrap();
        assert!(matches!(
            classifier.classify("anything"),
            Err(BayesError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_whitespace_pipeline_keeps_case() {
        let classifier = TextClassifier::new(
            ClassifierConfig::default(),
            Box::new(WhitespaceTokenizer::new()),
            StopWords::none(),
        )
        .unwrap();
        classifier.observe("URGENT Reply", "spam").unwrap();
        assert_eq!(classifier.classifier().feature_index().keys(), vec!["URGENT", "Reply"]);
    }
}
