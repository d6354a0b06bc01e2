//! BasketForge: market basket analysis and RFM customer segmentation
//!
//! This library mines association rules between products with Apriori and
//! segments customers into Best / Potential / Lost tiers by clustering their
//! Recency, Frequency and Monetary features with K-Means.

pub mod apriori;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod recommend;
pub mod report;
pub mod rfm;
pub mod rules;
pub mod segment;
pub mod store;
pub mod transaction;

// Re-export public items for easier access
pub use apriori::{mine, FrequentItemset};
pub use cli::Args;
pub use config::{AnalysisConfig, MiningParams, SegmentationParams};
pub use data::{load_transactions, parse_timestamp};
pub use error::{AnalysisError, ErrorKind, Result};
pub use model::{fit_kmeans, KMeansModel};
pub use pipeline::{
    analyze_baskets, analyze_transactions, segment_customers, AnalysisStatus, EmptyReason,
    MarketBasketReport, SegmentationReport,
};
pub use recommend::{plan_promotions, PromotionPlan};
pub use rfm::{compute_rfm, CustomerRfm, StandardScaler};
pub use rules::{generate_rules, AssociationRule, RuleRecord};
pub use segment::{assign_labels, label_for_rank, segment, CustomerSegment, SegmentLabel};
pub use store::{JsonFileStore, MemoryStore, ResultStore, Snapshot};
pub use transaction::{
    baskets_from_lines, baskets_from_pairs, dataset_stats, Basket, TransactionLine,
};
