//! K-Means clustering model implementation

use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SegmentationParams;
use crate::error::{AnalysisError, Result};

/// Fitted K-Means assignment for one segmentation run
#[derive(Debug, Clone)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster assignment per input row
    pub labels: Array1<usize>,
    /// Within-cluster sum of squares (inertia)
    pub inertia: f64,
}

impl KMeansModel {
    /// Members per cluster id; a zero entry is a cluster k-means left empty
    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.labels
            .iter()
            .filter(|&&label| label < self.n_clusters)
            .fold(vec![0; self.n_clusters], |mut sizes, &label| {
                sizes[label] += 1;
                sizes
            })
    }
}

/// Fit K-Means on standardized features
///
/// Runs `params.n_init` seeded restarts and keeps the one with the lowest
/// inertia, so the same features and seed always give the same assignment.
///
/// # Arguments
/// * `features` - Standardized feature matrix (n_samples, n_features)
/// * `params` - Cluster count, seed, restarts and convergence settings
///
/// # Returns
/// * Fitted `KMeansModel` with assignments and inertia
pub fn fit_kmeans(features: &Array2<f64>, params: &SegmentationParams) -> Result<KMeansModel> {
    let n_clusters = params.clusters;
    if features.nrows() < n_clusters {
        return Err(AnalysisError::TooManyClusters {
            clusters: n_clusters,
            customers: features.nrows(),
        });
    }

    let dataset = DatasetBase::from(features.clone());
    let rng = StdRng::seed_from_u64(params.seed);

    let model = KMeans::params_with(n_clusters, rng, L2Dist)
        .n_runs(params.n_init)
        .max_n_iterations(params.max_iters)
        .tolerance(params.tolerance)
        .fit(&dataset)?;

    let labels: Array1<usize> = model.predict(features);
    let inertia = compute_inertia(features, &labels, model.centroids());
    if !inertia.is_finite() {
        return Err(AnalysisError::Computation(format!(
            "k-means produced non-finite inertia {inertia}"
        )));
    }

    tracing::debug!(
        clusters = n_clusters,
        runs = params.n_init,
        inertia,
        "k-means fitted"
    );

    Ok(KMeansModel {
        n_clusters,
        labels,
        inertia,
    })
}

/// Compute within-cluster sum of squares (inertia)
fn compute_inertia(features: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    let mut inertia = 0.0;

    for (i, &cluster) in labels.iter().enumerate() {
        if cluster < centroids.nrows() {
            let point = features.row(i);
            let centroid = centroids.row(cluster);
            let distance_sq = point
                .iter()
                .zip(centroid.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>();
            inertia += distance_sq;
        }
    }

    inertia
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_features() -> Array2<f64> {
        // Three well separated groups of two points each
        Array2::from_shape_vec(
            (6, 3),
            vec![
                -2.0, -2.0, -2.0, //
                -2.1, -1.9, -2.0, //
                0.0, 0.1, 0.0, //
                0.1, 0.0, 0.1, //
                2.0, 2.0, 2.1, //
                2.1, 2.0, 2.0,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_kmeans() {
        let features = create_test_features();
        let model = fit_kmeans(&features, &SegmentationParams::default()).unwrap();

        assert_eq!(model.n_clusters, 3);
        assert_eq!(model.labels.len(), 6);
        assert!(model.inertia >= 0.0);

        assert_eq!(model.labels[0], model.labels[1]);
        assert_eq!(model.labels[2], model.labels[3]);
        assert_eq!(model.labels[4], model.labels[5]);
        assert_ne!(model.labels[0], model.labels[2]);
        assert_ne!(model.labels[2], model.labels[4]);
    }

    #[test]
    fn test_same_seed_same_assignment() {
        let features = create_test_features();
        let params = SegmentationParams { seed: 7, ..Default::default() };
        let first = fit_kmeans(&features, &params).unwrap();
        let second = fit_kmeans(&features, &params).unwrap();
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.inertia, second.inertia);
    }

    #[test]
    fn test_cluster_sizes() {
        let features = create_test_features();
        let model = fit_kmeans(&features, &SegmentationParams::default()).unwrap();

        let sizes = model.cluster_sizes();
        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes.iter().sum::<usize>(), 6);
        assert!(sizes.iter().all(|&size| size == 2));
    }

    #[test]
    fn test_cluster_sizes_reports_empty_clusters() {
        let model = KMeansModel {
            n_clusters: 3,
            labels: Array1::from(vec![0, 2, 2, 0, 2]),
            inertia: 0.0,
        };
        assert_eq!(model.cluster_sizes(), vec![2, 0, 3]);
    }

    #[test]
    fn test_too_many_clusters() {
        let features = create_test_features();
        let params = SegmentationParams { clusters: 7, ..Default::default() };
        assert!(matches!(
            fit_kmeans(&features, &params),
            Err(AnalysisError::TooManyClusters { clusters: 7, customers: 6 })
        ));
    }

    #[test]
    fn test_inertia_of_exact_centroids() {
        let features = Array2::from_shape_vec((2, 2), vec![0.0, 0.0, 2.0, 0.0]).unwrap();
        let centroids = Array2::from_shape_vec((1, 2), vec![1.0, 0.0]).unwrap();
        let labels = Array1::from(vec![0, 0]);
        assert_eq!(compute_inertia(&features, &labels, &centroids), 2.0);
    }
}
