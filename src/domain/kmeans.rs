//! One-dimensional k-means over prices, fitted with `linfa-clustering`.
//!
//! The generator is seeded from [`KMeansParams::seed`], so a fit is fully
//! determined by the input order, the values and the parameters.

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansParams {
    pub n_clusters: usize,
    pub seed: u64,
    /// Independent seedings; the lowest-inertia run wins.
    pub n_init: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            n_clusters: 9,
            seed: 42,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KMeansError {
    #[error("number of clusters must be at least 1")]
    NoClusters,

    #[error("number of data points ({points}) must be at least equal to number of clusters ({clusters})")]
    TooFewPoints { points: usize, clusters: usize },

    #[error("data contains non-finite values")]
    NonFinite,

    #[error("k-means fit failed: {0}")]
    Fit(String),
}

#[derive(Debug)]
pub struct KMeansModel {
    /// Fitted model from linfa
    pub model: KMeans<f64, L2Dist>,
    /// Requested cluster count; labels at or above the fitted count stay empty.
    pub n_clusters: usize,
    /// Cluster assignment per input value, in input order.
    pub labels: Vec<usize>,
    pub centroids: Vec<f64>,
    /// Within-cluster sum of squares.
    pub inertia: f64,
}

impl KMeansModel {
    /// Label of the nearest centroid.
    pub fn predict(&self, value: f64) -> usize {
        let point = Array2::from_elem((1, 1), value);
        let labels: Array1<usize> = self.model.predict(&point);
        labels.iter().next().copied().unwrap_or(0)
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in &self.labels {
            if label < self.n_clusters {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Labels that received at least one point.
    pub fn occupied_labels(&self) -> Vec<usize> {
        self.cluster_sizes()
            .iter()
            .enumerate()
            .filter(|(_, size)| **size > 0)
            .map(|(label, _)| label)
            .collect()
    }
}

/// Fits `params.n_clusters` centroids to `values`.
///
/// At most one centroid per distinct value is fitted; the remaining labels
/// stay empty.
pub fn fit_kmeans(values: &[f64], params: &KMeansParams) -> Result<KMeansModel, KMeansError> {
    let k = params.n_clusters;
    if k == 0 {
        return Err(KMeansError::NoClusters);
    }
    if values.len() < k {
        return Err(KMeansError::TooFewPoints {
            points: values.len(),
            clusters: k,
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(KMeansError::NonFinite);
    }

    let fitted = k.min(distinct_count(values));
    let records = Array2::from_shape_vec((values.len(), 1), values.to_vec())
        .map_err(|e| KMeansError::Fit(e.to_string()))?;
    let targets: Array1<usize> = Array1::zeros(values.len());
    let dataset = Dataset::new(records, targets);

    let rng = StdRng::seed_from_u64(params.seed);
    let model = KMeans::params_with(fitted, rng, L2Dist)
        .n_runs(params.n_init.max(1))
        .max_n_iterations(params.max_iterations as u64)
        .tolerance(params.tolerance)
        .fit(&dataset)
        .map_err(|e| KMeansError::Fit(e.to_string()))?;

    let labels: Array1<usize> = model.predict(&dataset);
    let labels = labels.to_vec();
    let centroids: Vec<f64> = model.centroids().column(0).to_vec();
    let inertia = compute_inertia(values, &labels, &centroids);

    Ok(KMeansModel {
        model,
        n_clusters: k,
        labels,
        centroids,
        inertia,
    })
}

fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    sorted.len()
}

fn compute_inertia(values: &[f64], labels: &[usize], centroids: &[f64]) -> f64 {
    values
        .iter()
        .zip(labels)
        .filter_map(|(v, &label)| centroids.get(label).map(|c| (v - c).powi(2)))
        .sum()
}
