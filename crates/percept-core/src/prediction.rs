//! Prediction results and top-K selection.

use serde::{Deserialize, Serialize};

/// One classification candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index into the model's label vocabulary.
    pub class_id: usize,

    /// Human-readable class name, or `class_<index>` when the vocabulary
    /// has no entry for this index.
    pub label: String,

    /// Probability in [0, 1].
    pub probability: f32,
}

/// Result of one prediction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Name of the model that produced this result.
    pub model: String,

    /// Top-K candidates, descending by probability, ties in index order.
    pub predictions: Vec<Prediction>,

    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Options for a prediction call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictOptions {
    /// Number of top candidates to return. Must be at least 1.
    pub top_k: usize,

    /// Candidates with probability strictly below this are dropped.
    pub threshold: f32,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: 0.0,
        }
    }
}

impl PredictOptions {
    /// Create options with the defaults (top 5, no threshold).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of top candidates.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the probability threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Select the top `k` scores at or above `threshold`.
///
/// Returns (index, score) pairs sorted descending by score. The sort is
/// stable, so equal scores keep their original index order.
pub fn select_top_k(scores: &[f32], k: usize, threshold: f32) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();

    indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    indexed
        .into_iter()
        .filter(|&(_, score)| score >= threshold)
        .take(k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_top_k_orders_descending() {
        let picks = select_top_k(&[0.1, 0.8, 0.05, 0.3], 3, 0.0);
        assert_eq!(picks, vec![(1, 0.8), (3, 0.3), (0, 0.1)]);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let picks = select_top_k(&[0.4, 0.4, 0.4, 0.1], 3, 0.0);
        assert_eq!(picks, vec![(0, 0.4), (1, 0.4), (2, 0.4)]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let picks = select_top_k(&[0.5, 0.3, 0.7], 5, 0.5);
        // 0.5 itself survives; only strictly-below scores are dropped
        assert_eq!(picks, vec![(2, 0.7), (0, 0.5)]);
    }

    #[test]
    fn test_threshold_one_may_return_empty() {
        let picks = select_top_k(&[0.9, 0.99], 5, 1.0);
        assert!(picks.is_empty());
    }

    #[test]
    fn test_k_larger_than_scores() {
        let picks = select_top_k(&[0.2, 0.1], 10, 0.0);
        assert_eq!(picks.len(), 2);
    }

    #[test]
    fn test_options_defaults() {
        let options = PredictOptions::new();
        assert_eq!(options.top_k, 5);
        assert_eq!(options.threshold, 0.0);
    }
}
