//! Row clustering with seeded k-means.
//!
//! The engine runs only when the dataset has at least 2 numeric columns and
//! 3 rows; otherwise the stage degrades to an error marker. The cluster
//! count adapts to the dataset: `k = clamp(rows / 3, 2, 3)`. Initialization
//! is k-means++ over a fixed-seed ChaCha stream with multiple restarts, so
//! identical input always yields identical assignments.

use crate::error::{AnalysisError, Result};
use crate::types::{ClusterOutcome, ClusterResult};
use crate::utils::NumericColumn;
use ndarray::{Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// K-means with k-means++ initialization and lowest-inertia restarts.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    pub tol: f64,
    /// Restarts; the run with the lowest inertia wins.
    pub n_init: usize,
    pub seed: u64,
    centroids: Option<Array2<f64>>,
    labels: Option<Vec<usize>>,
    inertia: Option<f64>,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            seed: 0,
            centroids: None,
            labels: None,
            inertia: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_restarts(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }

    pub fn labels(&self) -> Option<&[usize]> {
        self.labels.as_deref()
    }

    pub fn inertia(&self) -> Option<f64> {
        self.inertia
    }

    /// Fit on the feature matrix, keeping the lowest-inertia restart.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples < self.n_clusters {
            return Err(AnalysisError::Clustering(format!(
                "n_samples ({}) < n_clusters ({})",
                n_samples, self.n_clusters
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut best: Option<(f64, Vec<usize>, Array2<f64>)> = None;

        for restart in 0..self.n_init {
            let (inertia, labels, centroids) = self.lloyd(x, &mut rng);
            debug!(restart, inertia, "k-means restart finished");
            if best.as_ref().is_none_or(|(best_inertia, _, _)| inertia < *best_inertia) {
                best = Some((inertia, labels, centroids));
            }
        }

        let (inertia, labels, centroids) = best.ok_or_else(|| {
            AnalysisError::Clustering("no k-means restart produced a result".to_string())
        })?;
        self.inertia = Some(inertia);
        self.labels = Some(labels);
        self.centroids = Some(centroids);
        Ok(())
    }

    /// One Lloyd run: k-means++ init, then assign/update until convergence.
    fn lloyd(&self, x: &Array2<f64>, rng: &mut ChaCha8Rng) -> (f64, Vec<usize>, Array2<f64>) {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let mut centroids = Self::kmeans_pp_init(x, self.n_clusters, rng);
        let mut labels = vec![0usize; n_samples];

        for _ in 0..self.max_iter {
            let mut changed = 0usize;
            for i in 0..n_samples {
                let nearest = Self::nearest_centroid(&x.row(i), &centroids);
                if nearest != labels[i] {
                    changed += 1;
                    labels[i] = nearest;
                }
            }

            let mut new_centroids = Array2::zeros((self.n_clusters, n_features));
            let mut counts = vec![0usize; self.n_clusters];
            for i in 0..n_samples {
                counts[labels[i]] += 1;
                for j in 0..n_features {
                    new_centroids[[labels[i], j]] += x[[i, j]];
                }
            }
            for c in 0..self.n_clusters {
                if counts[c] > 0 {
                    for j in 0..n_features {
                        new_centroids[[c, j]] /= counts[c] as f64;
                    }
                } else {
                    // Empty cluster: reseed it from a random sample.
                    let idx = rng.gen_range(0..n_samples);
                    new_centroids.row_mut(c).assign(&x.row(idx));
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
            centroids = new_centroids;

            if changed == 0 || shift < self.tol {
                break;
            }
        }

        let inertia = (0..n_samples)
            .map(|i| Self::euclidean_sq(&x.row(i), &centroids.row(labels[i])))
            .sum();
        (inertia, labels, centroids)
    }

    /// K-means++: spread the initial centroids proportionally to squared
    /// distance from the ones already chosen.
    fn kmeans_pp_init(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
        let n_samples = x.nrows();
        let mut centroids = Array2::zeros((k, x.ncols()));

        let first = rng.gen_range(0..n_samples);
        centroids.row_mut(0).assign(&x.row(first));

        for c in 1..k {
            let dists: Vec<f64> = (0..n_samples)
                .map(|i| {
                    (0..c)
                        .map(|j| Self::euclidean_sq(&x.row(i), &centroids.row(j)))
                        .fold(f64::MAX, f64::min)
                })
                .collect();

            let total: f64 = dists.iter().sum();
            if total <= 0.0 {
                let idx = rng.gen_range(0..n_samples);
                centroids.row_mut(c).assign(&x.row(idx));
                continue;
            }

            let r = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            let mut chosen = n_samples - 1;
            for (i, &d) in dists.iter().enumerate() {
                cumulative += d;
                if cumulative >= r {
                    chosen = i;
                    break;
                }
            }
            centroids.row_mut(c).assign(&x.row(chosen));
        }

        centroids
    }

    fn nearest_centroid(row: &ArrayView1<f64>, centroids: &Array2<f64>) -> usize {
        let mut best = 0;
        let mut best_dist = f64::MAX;
        for c in 0..centroids.nrows() {
            let d = Self::euclidean_sq(row, &centroids.row(c));
            if d < best_dist {
                best_dist = d;
                best = c;
            }
        }
        best
    }

    fn euclidean_sq(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }
}

/// Adaptive cluster count: one cluster per ~3 rows, between 2 and 3.
pub(crate) fn adaptive_k(rows: usize) -> usize {
    (rows / 3).clamp(2, 3)
}

/// Assemble the numeric feature matrix (nulls filled with 0) row-major.
fn feature_matrix(columns: &[NumericColumn], rows: usize) -> Vec<Vec<f64>> {
    let filled: Vec<Vec<f64>> = columns.iter().map(|c| c.filled(0.0)).collect();
    (0..rows)
        .map(|row| filled.iter().map(|col| col[row]).collect())
        .collect()
}

/// Run the clustering stage.
///
/// Returns None when there are no numeric columns (the report omits the
/// field entirely); an error marker when the preconditions fail or the fit
/// errors; otherwise assignments, centroids and the clustered points.
pub fn cluster_rows(
    columns: &[NumericColumn],
    rows: usize,
    seed: u64,
    restarts: usize,
) -> Option<ClusterOutcome> {
    if columns.is_empty() {
        return None;
    }
    if columns.len() < 2 || rows < 3 {
        return Some(ClusterOutcome::Failed {
            error: format!(
                "clustering requires at least 2 numeric columns and 3 rows, got {} columns and {} rows",
                columns.len(),
                rows
            ),
        });
    }

    let points = feature_matrix(columns, rows);
    let flat: Vec<f64> = points.iter().flatten().copied().collect();
    let x = match Array2::from_shape_vec((rows, columns.len()), flat) {
        Ok(x) => x,
        Err(e) => {
            warn!("clustering degraded: {}", e);
            return Some(ClusterOutcome::Failed { error: e.to_string() });
        }
    };

    let mut model = KMeans::new(adaptive_k(rows))
        .with_seed(seed)
        .with_restarts(restarts);
    match model.fit(&x) {
        Ok(()) => {
            let centroids = model
                .centroids()
                .map(|c| c.rows().into_iter().map(|r| r.to_vec()).collect())
                .unwrap_or_default();
            let assignments = model.labels().map(<[usize]>::to_vec).unwrap_or_default();
            Some(ClusterOutcome::Ready(ClusterResult {
                assignments,
                centroids,
                points,
            }))
        }
        Err(e) => {
            warn!("clustering degraded: {}", e);
            Some(ClusterOutcome::Failed {
                error: e.to_string(),
            })
        }
    }
}
