//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{FastBayesArgs, OutputFormat};
use crate::error::Result;

/// Result structure for training.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingResult {
    pub state: String,
    pub label: String,
    pub documents_trained: usize,
    pub classes: usize,
    pub vocabulary_size: usize,
    pub total_samples: u64,
    pub duration_ms: u64,
}

/// A single ranked label.
#[derive(Debug, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Result structure for classification.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub model_version: u64,
    pub best: Option<String>,
    pub predictions: Vec<Prediction>,
    pub duration_ms: u64,
}

/// Per-class statistics of a state file.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassStats {
    pub label: String,
    pub samples: u64,
    pub feature_mass: f64,
    pub distinct_features: usize,
}

/// Statistics of a state file.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateStats {
    pub feature_model: String,
    pub alpha: f64,
    pub vocabulary_size: usize,
    pub total_samples: u64,
    pub classes: Vec<ClassStats>,
}

/// Output a result in the requested format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &FastBayesArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &FastBayesArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;

    match result {
        _ if std::any::type_name::<T>().contains("ClassificationResult") => {
            output_classification_human(&value)
        }
        _ if std::any::type_name::<T>().contains("StateStats") => output_stats_human(&value),
        _ => output_generic_human(&value),
    }
}

/// Output a ranking as one line per label.
fn output_classification_human(value: &serde_json::Value) -> Result<()> {
    if let Some(best) = value.get("best").and_then(|b| b.as_str()) {
        println!("Best label: {best}");
    }
    if let Some(version) = value.get("model_version") {
        println!("Model version: {}", format_value(version));
    }
    println!();

    if let Some(predictions) = value.get("predictions").and_then(|p| p.as_array()) {
        for (rank, prediction) in predictions.iter().enumerate() {
            let label = prediction.get("label").map(format_value).unwrap_or_default();
            let score = prediction
                .get("score")
                .and_then(|s| s.as_f64())
                .unwrap_or(f64::NAN);
            match prediction.get("probability").and_then(|p| p.as_f64()) {
                Some(probability) => println!(
                    "{:>3}. {label:<24} score={score:.4} p={probability:.4}",
                    rank + 1
                ),
                None => println!("{:>3}. {label:<24} score={score:.4}", rank + 1),
            }
        }
    }
    Ok(())
}

/// Output state statistics with a table of classes.
fn output_stats_human(value: &serde_json::Value) -> Result<()> {
    for key in ["feature_model", "alpha", "vocabulary_size", "total_samples"] {
        if let Some(val) = value.get(key) {
            println!("{key}: {}", format_value(val));
        }
    }

    if let Some(classes) = value.get("classes").and_then(|c| c.as_array()) {
        println!();
        println!("{:<24} {:>10} {:>14} {:>10}", "label", "samples", "mass", "features");
        for class in classes {
            println!(
                "{:<24} {:>10} {:>14} {:>10}",
                class.get("label").map(format_value).unwrap_or_default(),
                class.get("samples").map(format_value).unwrap_or_default(),
                class.get("feature_mass").map(format_value).unwrap_or_default(),
                class.get("distinct_features").map(format_value).unwrap_or_default(),
            );
        }
    }
    Ok(())
}

/// Output generic data in human format.
fn output_generic_human(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                let formatted_val = format_value(val);
                println!("{key}: {formatted_val}");
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{formatted_value}");
        }
    }
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &FastBayesArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}
