//! Isolation forest: the global multivariate anomaly detector.
//!
//! Anomalous rows are isolated in fewer random splits than normal rows; the
//! forest averages path lengths over many random trees and converts them to
//! a score in (0, 1). Rows scoring above the contamination-derived threshold
//! are flagged.

use crate::error::{AnalysisError, Result};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// One randomized isolation tree.
#[derive(Debug, Clone)]
enum IsolationTree {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
    External {
        size: usize,
    },
}

impl IsolationTree {
    fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let n_samples = indices.len();
        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        let feature = rng.gen_range(0..x.ncols());
        let values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        let min_val = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        // An all-NaN feature leaves the fold bounds at their infinities;
        // neither it nor a constant feature can be split.
        if !min_val.is_finite() || !max_val.is_finite() || (max_val - min_val).abs() < 1e-10 {
            return IsolationTree::External { size: n_samples };
        }

        let threshold = rng.gen_range(min_val..max_val);
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] < threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        IsolationTree::Internal {
            feature,
            threshold,
            left: Box::new(Self::build(x, &left_indices, height + 1, max_height, rng)),
            right: Box::new(Self::build(x, &right_indices, height + 1, max_height, rng)),
        }
    }

    fn path_length(&self, sample: &[f64], current_height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => current_height as f64 + Self::c(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, current_height + 1)
                } else {
                    right.path_length(sample, current_height + 1)
                }
            }
        }
    }

    /// Average path length of an unsuccessful BST search,
    /// `c(n) = 2 H(n-1) - 2(n-1)/n`.
    fn c(n: usize) -> f64 {
        const EULER_MASCHERONI: f64 = 0.577_215_664_9;
        match n {
            0 | 1 => 0.0,
            2 => 1.0,
            _ => {
                let n = n as f64;
                2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
            }
        }
    }
}

/// Isolation forest with a contamination-derived decision threshold.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
    trees: Option<Vec<IsolationTree>>,
    threshold: Option<f64>,
    n_samples: Option<usize>,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl IsolationForest {
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 0,
            trees: None,
            threshold: None,
            n_samples: None,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Expected fraction of anomalous rows, clamped into `[0, 0.5]`.
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit on the feature matrix and derive the decision threshold so that
    /// at most the top `⌊contamination * n⌋` rows score above it.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples < 2 {
            return Err(AnalysisError::AnomalyDetection(format!(
                "need at least 2 rows, got {}",
                n_samples
            )));
        }

        let samples_per_tree = self.max_samples.min(n_samples);
        let max_height = (samples_per_tree as f64).log2().ceil() as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            // Bootstrap sample per tree.
            let indices: Vec<usize> = (0..samples_per_tree)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();
            trees.push(IsolationTree::build(x, &indices, 0, max_height, &mut rng));
        }
        self.trees = Some(trees);
        self.n_samples = Some(samples_per_tree);

        let scores = self.score_samples(x)?;
        let mut sorted: Vec<f64> = scores.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let cutoff = ((self.contamination * n_samples as f64) as usize).min(n_samples - 1);
        self.threshold = Some(sorted[cutoff]);
        Ok(())
    }

    /// Anomaly score per row, in (0, 1); higher is more anomalous.
    pub fn score_samples(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        let trees = self
            .trees
            .as_ref()
            .ok_or_else(|| AnalysisError::AnomalyDetection("model not fitted".to_string()))?;
        let c_n = IsolationTree::c(self.n_samples.unwrap_or(self.max_samples));

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let sample: Vec<f64> = row.iter().copied().collect();
                let avg_path: f64 = trees
                    .iter()
                    .map(|tree| tree.path_length(&sample, 0))
                    .sum::<f64>()
                    / trees.len() as f64;
                2.0_f64.powf(-avg_path / c_n)
            })
            .collect())
    }

    /// Binary flag per row: true means anomalous.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<bool>> {
        let threshold = self
            .threshold
            .ok_or_else(|| AnalysisError::AnomalyDetection("model not fitted".to_string()))?;
        Ok(self
            .score_samples(x)?
            .into_iter()
            .map(|s| s > threshold)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clustered_data_with_outliers() -> Array2<f64> {
        let mut data = Vec::new();
        for i in 0..50 {
            data.push((i % 10) as f64);
            data.push(((i % 10) + 1) as f64);
        }
        data.extend_from_slice(&[100.0, 100.0]);
        data.extend_from_slice(&[-50.0, -50.0]);
        Array2::from_shape_vec((52, 2), data).unwrap()
    }

    #[test]
    fn test_outliers_score_higher() {
        let x = clustered_data_with_outliers();
        let mut forest = IsolationForest::new()
            .with_n_estimators(50)
            .with_contamination(0.05)
            .with_seed(42);
        forest.fit(&x).unwrap();

        let scores = forest.score_samples(&x).unwrap();
        assert!(scores[50] > scores[0]);
        assert!(scores[51] > scores[0]);

        let flags = forest.predict(&x).unwrap();
        assert!(flags.iter().any(|&f| f));
    }

    #[test]
    fn test_deterministic_under_fixed_seed() {
        let x = clustered_data_with_outliers();
        let mut a = IsolationForest::new().with_seed(7);
        let mut b = IsolationForest::new().with_seed(7);
        a.fit(&x).unwrap();
        b.fit(&x).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_fit_rejects_single_row() {
        let x = Array2::from_shape_vec((1, 2), vec![1.0, 2.0]).unwrap();
        let mut forest = IsolationForest::new();
        assert!(forest.fit(&x).is_err());
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let x = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
        let forest = IsolationForest::new();
        assert!(forest.predict(&x).is_err());
    }

    #[test]
    fn test_all_nan_feature_does_not_panic() {
        let mut data = Vec::new();
        for i in 0..12 {
            data.push(i as f64);
            data.push(f64::NAN);
        }
        let x = Array2::from_shape_vec((12, 2), data).unwrap();
        let mut forest = IsolationForest::new().with_seed(3);
        forest.fit(&x).unwrap();
        for score in forest.score_samples(&x).unwrap() {
            assert!(score.is_finite());
        }
    }

    #[test]
    fn test_contamination_bounds_flagged_count() {
        // 9 inlier rows plus one extreme row; 10% of 10 rows is exactly 1.
        let mut data = Vec::new();
        for i in 0..9 {
            data.push(i as f64);
            data.push((i + 1) as f64);
        }
        data.extend_from_slice(&[100.0, 100.0]);
        let x = Array2::from_shape_vec((10, 2), data).unwrap();
        let mut forest = IsolationForest::new().with_contamination(0.1).with_seed(0);
        forest.fit(&x).unwrap();
        let flags = forest.predict(&x).unwrap();
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
        assert!(flags[9]);
    }

    #[test]
    fn test_scores_in_unit_interval() {
        let x = clustered_data_with_outliers();
        let mut forest = IsolationForest::new().with_seed(0);
        forest.fit(&x).unwrap();
        for score in forest.score_samples(&x).unwrap() {
            assert!(score > 0.0 && score < 1.0);
        }
    }
}
