//! End-to-end market basket and customer segmentation pipelines
//!
//! Both pipelines validate their parameters before touching the data and
//! return a complete report or an error, never a partial result. An empty
//! dataset or thresholds that leave nothing behind are reported through
//! [`AnalysisStatus::Empty`] rather than as failures.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::apriori::{mine, FrequentItemset};
use crate::config::{MiningParams, SegmentationParams};
use crate::error::Result;
use crate::rfm::compute_rfm;
use crate::rules::{generate_rules, AssociationRule, RuleRecord};
use crate::segment::{
    label_statistics, segment, ClusterProfile, CustomerSegment, LabelStats, SegmentLabel,
};
use crate::transaction::{baskets_from_lines, Basket, TransactionLine};

/// Why a run produced no records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmptyReason {
    NoTransactions,
    NoFrequentItemsets,
    NoRulesPassedFilters,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::NoTransactions => "the transaction dataset is empty",
            Self::NoFrequentItemsets => {
                "no itemset reached the minimum support; try a lower min_support"
            }
            Self::NoRulesPassedFilters => {
                "no rule passed the confidence and lift filters; try a lower min_confidence"
            }
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisStatus {
    Completed,
    Empty(EmptyReason),
}

impl AnalysisStatus {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty(_))
    }
}

/// Output of the market basket pipeline
#[derive(Debug, Clone, Serialize)]
pub struct MarketBasketReport {
    pub status: AnalysisStatus,
    pub basket_count: usize,
    pub itemsets: Vec<FrequentItemset>,
    /// Ordered by confidence, then lift, both descending
    pub rules: Vec<AssociationRule>,
}

impl MarketBasketReport {
    /// Rules in display form with values rounded to four decimals
    pub fn records(&self) -> Vec<RuleRecord> {
        self.rules.iter().map(AssociationRule::to_record).collect()
    }
}

/// Mine frequent itemsets from baskets and derive association rules
pub fn analyze_baskets(baskets: &[Basket], params: &MiningParams) -> Result<MarketBasketReport> {
    params.validate()?;

    let report = |status, itemsets, rules| MarketBasketReport {
        status,
        basket_count: baskets.len(),
        itemsets,
        rules,
    };

    if baskets.is_empty() {
        tracing::warn!("market basket analysis skipped: {}", EmptyReason::NoTransactions);
        let status = AnalysisStatus::Empty(EmptyReason::NoTransactions);
        return Ok(report(status, Vec::new(), Vec::new()));
    }

    let itemsets = mine(baskets, params.min_support)?;
    if itemsets.is_empty() {
        tracing::warn!(min_support = params.min_support, "{}", EmptyReason::NoFrequentItemsets);
        let status = AnalysisStatus::Empty(EmptyReason::NoFrequentItemsets);
        return Ok(report(status, itemsets, Vec::new()));
    }

    let rules = generate_rules(&itemsets, params.min_confidence)?;
    let status = if rules.is_empty() {
        tracing::warn!(
            min_confidence = params.min_confidence,
            "{}",
            EmptyReason::NoRulesPassedFilters
        );
        AnalysisStatus::Empty(EmptyReason::NoRulesPassedFilters)
    } else {
        AnalysisStatus::Completed
    };

    tracing::info!(
        baskets = baskets.len(),
        itemsets = itemsets.len(),
        rules = rules.len(),
        "market basket analysis complete"
    );
    Ok(report(status, itemsets, rules))
}

pub fn analyze_transactions(
    lines: &[TransactionLine],
    params: &MiningParams,
) -> Result<MarketBasketReport> {
    analyze_baskets(&baskets_from_lines(lines), params)
}

/// Output of the segmentation pipeline
#[derive(Debug, Clone, Serialize)]
pub struct SegmentationReport {
    pub status: AnalysisStatus,
    pub reference_date: NaiveDateTime,
    /// Ordered Best, Potential, Lost, then by customer id
    pub segments: Vec<CustomerSegment>,
    /// Non-empty clusters, best first
    pub clusters: Vec<ClusterProfile>,
    pub label_stats: BTreeMap<SegmentLabel, LabelStats>,
    pub inertia: f64,
}

/// Compute RFM features relative to `reference_date` and segment customers
pub fn segment_customers(
    lines: &[TransactionLine],
    reference_date: NaiveDateTime,
    params: &SegmentationParams,
) -> Result<SegmentationReport> {
    params.validate()?;

    if lines.is_empty() {
        tracing::warn!("segmentation skipped: {}", EmptyReason::NoTransactions);
        return Ok(SegmentationReport {
            status: AnalysisStatus::Empty(EmptyReason::NoTransactions),
            reference_date,
            segments: Vec::new(),
            clusters: Vec::new(),
            label_stats: BTreeMap::new(),
            inertia: 0.0,
        });
    }

    let rfm = compute_rfm(lines, reference_date)?;
    let segmentation = segment(&rfm, params)?;
    let label_stats = label_statistics(&segmentation.segments);

    Ok(SegmentationReport {
        status: AnalysisStatus::Completed,
        reference_date,
        segments: segmentation.segments,
        clusters: segmentation.clusters,
        label_stats,
        inertia: segmentation.inertia,
    })
}
