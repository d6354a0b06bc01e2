//! Customer segmentation: standardize RFM, cluster, then label clusters by score
//!
//! Tier labels come from a fixed ranking policy rather than from the
//! clustering itself. Clusters are ordered by a weighted composite of their
//! mean Recency, Frequency and Monetary values and the ranked list is mapped
//! onto Best / Potential / Lost by [`label_for_rank`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SegmentationParams;
use crate::error::{AnalysisError, Result};
use crate::model::fit_kmeans;
use crate::rfm::{feature_matrix, CustomerRfm, StandardScaler};
use crate::rules::round_to;

pub const RECENCY_WEIGHT: f64 = -0.3;
pub const FREQUENCY_WEIGHT: f64 = 0.3;
pub const MONETARY_WEIGHT: f64 = 0.4;

/// Qualitative customer tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SegmentLabel {
    Best,
    Potential,
    Lost,
}

impl SegmentLabel {
    pub const ALL: [SegmentLabel; 3] = [Self::Best, Self::Potential, Self::Lost];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Best => "Best Customers",
            Self::Potential => "Potential Customers",
            Self::Lost => "Lost Customers",
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite cluster score; recent, frequent, high-spending clusters score higher.
pub fn composite_score(mean_recency: f64, mean_frequency: f64, mean_monetary: f64) -> f64 {
    RECENCY_WEIGHT * mean_recency + FREQUENCY_WEIGHT * mean_frequency + MONETARY_WEIGHT * mean_monetary
}

/// Tier for the cluster at position `rank` (0 = highest score) out of `k`.
///
/// With three clusters the ranks map to Best, Potential, Lost; with two
/// there is no Lost tier. Any other `k` is cut into thirds using floor
/// division: ranks below `k / 3` are Best, ranks below `2k / 3` Potential,
/// the rest Lost.
pub fn label_for_rank(rank: usize, k: usize) -> SegmentLabel {
    match k {
        2 => {
            if rank == 0 {
                SegmentLabel::Best
            } else {
                SegmentLabel::Potential
            }
        }
        3 => match rank {
            0 => SegmentLabel::Best,
            1 => SegmentLabel::Potential,
            _ => SegmentLabel::Lost,
        },
        _ => {
            if rank < k / 3 {
                SegmentLabel::Best
            } else if rank < 2 * k / 3 {
                SegmentLabel::Potential
            } else {
                SegmentLabel::Lost
            }
        }
    }
}

/// Map cluster ids, ordered best first, to their tier
pub fn assign_labels(ranked_clusters: &[usize], k: usize) -> HashMap<usize, SegmentLabel> {
    ranked_clusters
        .iter()
        .enumerate()
        .map(|(rank, &cluster_id)| (cluster_id, label_for_rank(rank, k)))
        .collect()
}

/// Aggregate view of one cluster in original units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster_id: usize,
    pub size: usize,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
    pub score: f64,
    pub rank: usize,
    pub label: SegmentLabel,
}

/// Rank the non-empty clusters by composite score, best first.
/// Equal scores fall back to ascending cluster id.
pub fn rank_clusters(rfm: &[CustomerRfm], assignments: &[usize], k: usize) -> Vec<ClusterProfile> {
    let mut sums = vec![(0usize, 0.0f64, 0.0f64, 0.0f64); k];
    for (customer, &cluster_id) in rfm.iter().zip(assignments) {
        if let Some(sum) = sums.get_mut(cluster_id) {
            let [recency, frequency, monetary] = customer.features();
            sum.0 += 1;
            sum.1 += recency;
            sum.2 += frequency;
            sum.3 += monetary;
        }
    }

    let mut profiles: Vec<ClusterProfile> = sums
        .into_iter()
        .enumerate()
        .filter(|(_, sum)| sum.0 > 0)
        .map(|(cluster_id, (size, recency, frequency, monetary))| {
            let n = size as f64;
            let (mean_recency, mean_frequency, mean_monetary) = (recency / n, frequency / n, monetary / n);
            ClusterProfile {
                cluster_id,
                size,
                mean_recency,
                mean_frequency,
                mean_monetary,
                score: composite_score(mean_recency, mean_frequency, mean_monetary),
                rank: 0,
                label: SegmentLabel::Best,
            }
        })
        .collect();

    profiles.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.cluster_id.cmp(&b.cluster_id))
    });

    let ranked: Vec<usize> = profiles.iter().map(|p| p.cluster_id).collect();
    let labels = assign_labels(&ranked, k);
    for (rank, profile) in profiles.iter_mut().enumerate() {
        profile.rank = rank;
        profile.label = labels[&profile.cluster_id];
    }

    profiles
}

/// A customer's RFM features with the cluster and tier from one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
    #[serde(flatten)]
    pub rfm: CustomerRfm,
    pub cluster_id: usize,
    pub label: SegmentLabel,
}

/// Per-tier means (rounded to two decimals) and member count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelStats {
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
    pub customers: usize,
}

pub fn label_statistics(segments: &[CustomerSegment]) -> BTreeMap<SegmentLabel, LabelStats> {
    let mut sums: BTreeMap<SegmentLabel, (usize, f64, f64, f64)> = BTreeMap::new();
    for segment in segments {
        let [recency, frequency, monetary] = segment.rfm.features();
        let sum = sums.entry(segment.label).or_default();
        sum.0 += 1;
        sum.1 += recency;
        sum.2 += frequency;
        sum.3 += monetary;
    }

    sums.into_iter()
        .map(|(label, (count, recency, frequency, monetary))| {
            let n = count as f64;
            let stats = LabelStats {
                mean_recency: round_to(recency / n, 2),
                mean_frequency: round_to(frequency / n, 2),
                mean_monetary: round_to(monetary / n, 2),
                customers: count,
            };
            (label, stats)
        })
        .collect()
}

/// Result of one segmentation run
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Ordered Best, Potential, Lost, then by customer id
    pub segments: Vec<CustomerSegment>,
    /// Non-empty clusters, best first
    pub clusters: Vec<ClusterProfile>,
    pub inertia: f64,
}

/// Segment customers into `params.clusters` clusters and label them.
///
/// # Arguments
/// * `rfm` - One row per customer
/// * `params` - Cluster count and K-Means settings
///
/// # Returns
/// * Every customer with its cluster id and tier
pub fn segment(rfm: &[CustomerRfm], params: &SegmentationParams) -> Result<Segmentation> {
    params.validate()?;
    let k = params.clusters;
    if k > rfm.len() {
        return Err(AnalysisError::TooManyClusters {
            clusters: k,
            customers: rfm.len(),
        });
    }

    // Duplicate profiles cannot seed more centroids than there are distinct
    // points; fit fewer clusters but keep labelling with the requested k
    let distinct = distinct_profiles(rfm);
    let fit_params = SegmentationParams {
        clusters: k.min(distinct),
        ..*params
    };
    if fit_params.clusters < k {
        tracing::warn!(
            requested = k,
            distinct,
            "fewer distinct RFM profiles than clusters; fitting one cluster per profile"
        );
    }

    // Step 1: standardize each RFM dimension
    let raw = feature_matrix(rfm);
    let (_, standardized) = StandardScaler::fit_transform(&raw);

    // Step 2: cluster
    let model = fit_kmeans(&standardized, &fit_params)?;
    let assignments = model.labels.to_vec();
    let empty = model.cluster_sizes().iter().filter(|&&size| size == 0).count();
    if empty > 0 {
        tracing::warn!(empty, "k-means left clusters without members");
    }

    // Step 3 and 4: score, rank and label clusters in original units
    let clusters = rank_clusters(rfm, &assignments, k);
    let labels: HashMap<usize, SegmentLabel> =
        clusters.iter().map(|c| (c.cluster_id, c.label)).collect();

    // Step 5: attach labels
    let mut segments = rfm
        .iter()
        .zip(&assignments)
        .map(|(customer, &cluster_id)| {
            let label = labels.get(&cluster_id).copied().ok_or_else(|| {
                AnalysisError::Computation(format!("cluster {cluster_id} has no label"))
            })?;
            Ok(CustomerSegment {
                rfm: customer.clone(),
                cluster_id,
                label,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    segments.sort_by(|a, b| {
        a.label
            .cmp(&b.label)
            .then_with(|| a.rfm.customer_id.cmp(&b.rfm.customer_id))
    });

    tracing::info!(
        customers = segments.len(),
        clusters = clusters.len(),
        inertia = model.inertia,
        "segmentation complete"
    );

    Ok(Segmentation {
        segments,
        clusters,
        inertia: model.inertia,
    })
}

fn distinct_profiles(rfm: &[CustomerRfm]) -> usize {
    rfm.iter()
        .map(|c| (c.recency, c.frequency, c.monetary.to_bits()))
        .collect::<HashSet<_>>()
        .len()
}
