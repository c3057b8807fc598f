//! Log-space numeric helpers.

/// `ln(sum(exp(x)))`, computed without overflow by shifting by the maximum.
///
/// Returns negative infinity for an empty slice.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY || max.is_nan() {
        return max;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Normalize log-scores into probabilities that sum to 1.
pub fn softmax(log_scores: &[f64]) -> Vec<f64> {
    let norm = log_sum_exp(log_scores);
    log_scores.iter().map(|&v| (v - norm).exp()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sum_exp_matches_naive() {
        let values = [0.1, -2.0, 1.5];
        let naive = values.iter().map(|v: &f64| v.exp()).sum::<f64>().ln();
        assert!((log_sum_exp(&values) - naive).abs() < 1e-12);
    }

    #[test]
    fn test_log_sum_exp_handles_large_magnitudes() {
        let values = [-1000.0, -1000.0];
        let result = log_sum_exp(&values);
        assert!((result - (-1000.0 + 2f64.ln())).abs() < 1e-9);
        assert_eq!(log_sum_exp(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_softmax() {
        let probs = softmax(&[-2000.0, -2001.0, -2002.0]);

        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }
}
