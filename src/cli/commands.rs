//! Command implementations for the fast-bayes CLI.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::classifier::NaiveBayes;
use crate::config::{ClassifierConfig, FeatureModel};
use crate::persist::TrainingState;
use crate::text::{StopWords, TextClassifier, UnicodeWordTokenizer};

/// Execute a CLI command.
pub fn execute_command(args: FastBayesArgs) -> Result<()> {
    match &args.command {
        Command::Train(train_args) => train(train_args.clone(), &args),
        Command::Classify(classify_args) => classify(classify_args.clone(), &args),
        Command::Stats(stats_args) => show_stats(stats_args.clone(), &args),
    }
}

/// Train documents for one label and write the state back.
fn train(args: TrainArgs, cli_args: &FastBayesArgs) -> Result<()> {
    let start_time = Instant::now();

    let documents = match (&args.text, &args.file) {
        (Some(text), _) => vec![text.clone()],
        (None, Some(file)) => read_documents(file)?,
        (None, None) => anyhow::bail!("either --text or --file is required"),
    };

    let config = ClassifierConfig::new()
        .with_feature_model(FeatureModel::from(args.feature_model))
        .with_alpha(args.alpha);
    let classifier = if args.state.exists() {
        let classifier = load_classifier(&args.state)?;
        if classifier.config() != &config {
            warn!(
                "State file {} keeps its own configuration; --feature-model and --alpha are ignored",
                args.state.display()
            );
        }
        classifier
    } else {
        info!("Creating new state file at {}", args.state.display());
        NaiveBayes::new(config)?
    };

    let text = text_classifier(classifier);
    for document in &documents {
        text.observe_weighted(document, &args.label, args.multiplicity)?;
    }
    debug!("Trained {} documents for {:?}", documents.len(), args.label);

    let nb = text.classifier();
    TrainingState::capture(nb)
        .save(&args.state)
        .with_context(|| format!("failed to write state file {}", args.state.display()))?;

    let result = TrainingResult {
        state: args.state.display().to_string(),
        label: args.label.clone(),
        documents_trained: documents.len(),
        classes: nb.class_registry().len(),
        vocabulary_size: nb.feature_index().len(),
        total_samples: nb.statistics().total_samples(),
        duration_ms: start_time.elapsed().as_millis() as u64,
    };

    output_result("Training completed", &result, cli_args)?;
    Ok(())
}

/// Rank the labels of a state file for a document.
fn classify(args: ClassifyArgs, cli_args: &FastBayesArgs) -> Result<()> {
    let start_time = Instant::now();

    let text = text_classifier(load_classifier(&args.state)?);
    let ranking = text.rank(&args.text)?;

    let probabilities = if args.probabilities {
        Some(ranking.probabilities())
    } else {
        None
    };
    let predictions = ranking
        .top(args.top)
        .iter()
        .enumerate()
        .map(|(rank, entry)| Prediction {
            label: entry.label.clone(),
            score: entry.score,
            probability: probabilities.as_ref().map(|p| p[rank]),
        })
        .collect::<Vec<_>>();

    let result = ClassificationResult {
        model_version: ranking.model_version(),
        best: ranking.best().map(|entry| entry.label.clone()),
        predictions,
        duration_ms: start_time.elapsed().as_millis() as u64,
    };

    output_result("Classification results", &result, cli_args)?;
    Ok(())
}

/// Show per-class statistics of a state file.
fn show_stats(args: StatsArgs, cli_args: &FastBayesArgs) -> Result<()> {
    let state = load_state(&args.state)?;

    let feature_model = match state.config.feature_model {
        FeatureModel::Multinomial => "multinomial",
        FeatureModel::Bernoulli => "bernoulli",
    };
    let classes = state
        .classes
        .iter()
        .zip(&state.statistics.classes)
        .map(|(label, counts)| ClassStats {
            label: label.clone(),
            samples: counts.samples,
            feature_mass: counts.mass,
            distinct_features: counts.features.len(),
        })
        .collect::<Vec<_>>();

    let stats = StateStats {
        feature_model: feature_model.to_string(),
        alpha: state.config.alpha,
        vocabulary_size: state.features.len(),
        total_samples: state.statistics.total_samples(),
        classes,
    };

    output_result("State statistics", &stats, cli_args)?;
    Ok(())
}

/// Read one document per non-empty line.
fn read_documents(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read documents from {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn load_state(path: &Path) -> Result<TrainingState<String, String>> {
    TrainingState::load(path)
        .with_context(|| format!("failed to load state file {}", path.display()))
}

fn load_classifier(path: &Path) -> Result<NaiveBayes> {
    let classifier = load_state(path)?
        .restore()
        .with_context(|| format!("state file {} is inconsistent", path.display()))?;
    Ok(classifier)
}

fn text_classifier(classifier: NaiveBayes) -> TextClassifier {
    TextClassifier::from_classifier(
        classifier,
        Box::new(UnicodeWordTokenizer::new()),
        StopWords::english(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(args: &[&str]) -> Result<()> {
        let mut argv = vec!["fast-bayes", "-q", "--format", "json"];
        argv.extend_from_slice(args);
        execute_command(FastBayesArgs::parse_from(argv))
    }

    #[test]
    fn test_train_then_classify() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let state = state.to_str().unwrap();

        run(&["train", "--state", state, "--label", "spam", "--text", "free money now"]).unwrap();
        run(&["train", "--state", state, "--label", "ham", "--text", "team meeting notes"])
            .unwrap();
        run(&["classify", "--state", state, "--text", "free money", "--probabilities"]).unwrap();
        run(&["stats", "--state", state]).unwrap();

        let saved = TrainingState::<String, String>::load(state).unwrap();
        assert_eq!(saved.classes, vec!["spam", "ham"]);
        assert_eq!(saved.statistics.total_samples(), 2);
    }

    #[test]
    fn test_train_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs.txt");
        fs::write(&docs, "cheap pills\n\n  win a prize  \n").unwrap();
        let state = dir.path().join("state.json");

        run(&[
            "train",
            "--state",
            state.to_str().unwrap(),
            "--label",
            "spam",
            "--file",
            docs.to_str().unwrap(),
            "--multiplicity",
            "2",
        ])
        .unwrap();

        let saved = TrainingState::<String, String>::load(&state).unwrap();
        assert_eq!(saved.statistics.total_samples(), 4);
    }

    #[test]
    fn test_classify_missing_state_fails() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("missing.json");
        assert!(run(&["classify", "--state", state.to_str().unwrap(), "--text", "x"]).is_err());
    }
}
