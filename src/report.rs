//! Plain-text rendering of analysis results for the console

use std::fmt::{self, Write};

use crate::pipeline::{AnalysisStatus, MarketBasketReport, SegmentationReport};
use crate::recommend::PromotionPlan;
use crate::rules::RuleRecord;
use crate::segment::SegmentLabel;
use crate::transaction::DatasetStats;

pub fn render_dataset_stats<W: Write>(out: &mut W, stats: &DatasetStats) -> fmt::Result {
    writeln!(out, "=== Dataset Statistics ===")?;
    writeln!(out, "Transactions: {}", stats.transactions)?;
    writeln!(out, "Customers:    {}", stats.customers)?;
    writeln!(out, "Products:     {}", stats.products)?;
    writeln!(out, "Revenue:      {:.2}", stats.revenue)
}

/// Render the first `top` rules as a table
pub fn render_rules<W: Write>(out: &mut W, report: &MarketBasketReport, top: usize) -> fmt::Result {
    writeln!(out, "=== Association Rules ===")?;
    writeln!(
        out,
        "Baskets: {}  Frequent itemsets: {}  Rules: {}",
        report.basket_count,
        report.itemsets.len(),
        report.rules.len()
    )?;

    if let AnalysisStatus::Empty(reason) = report.status {
        return writeln!(out, "\nNo rules: {reason}");
    }

    let records: Vec<RuleRecord> = report.rules.iter().take(top).map(|r| r.to_record()).collect();
    writeln!(out)?;
    writeln!(
        out,
        "  {:<30} | {:<30} | {:>8} | {:>10} | {:>8}",
        "Antecedents", "Consequents", "Support", "Confidence", "Lift"
    )?;
    writeln!(out, "  {}", "-".repeat(98))?;
    for record in &records {
        writeln!(
            out,
            "  {:<30} | {:<30} | {:>8.4} | {:>10.4} | {:>8.4}",
            record.antecedents, record.consequents, record.support, record.confidence, record.lift
        )?;
    }
    if report.rules.len() > records.len() {
        writeln!(out, "  ... {} more", report.rules.len() - records.len())?;
    }
    Ok(())
}

pub fn render_segmentation<W: Write>(out: &mut W, report: &SegmentationReport) -> fmt::Result {
    writeln!(out, "=== Customer Segmentation ===")?;
    writeln!(out, "Reference date: {}", report.reference_date)?;

    if let AnalysisStatus::Empty(reason) = report.status {
        return writeln!(out, "\nNo segments: {reason}");
    }

    let total = report.segments.len();
    writeln!(out, "Total customers: {total}")?;
    writeln!(out, "Within-cluster sum of squares (Inertia): {:.2}", report.inertia)?;

    writeln!(out, "\nClusters (ranked by score):")?;
    writeln!(out, "  Rank | Cluster | Size | Recency | Frequency | Monetary | Score    | Label")?;
    writeln!(out, "  -----|---------|------|---------|-----------|----------|----------|------")?;
    for cluster in &report.clusters {
        writeln!(
            out,
            "  {:4} | {:7} | {:4} | {:7.2} | {:9.2} | {:8.2} | {:8.2} | {}",
            cluster.rank,
            cluster.cluster_id,
            cluster.size,
            cluster.mean_recency,
            cluster.mean_frequency,
            cluster.mean_monetary,
            cluster.score,
            cluster.label
        )?;
    }

    writeln!(out, "\nTiers:")?;
    for (label, stats) in &report.label_stats {
        let percentage = stats.customers as f64 / total as f64 * 100.0;
        writeln!(
            out,
            "  {:<20} {:4} customers ({:5.1}%)  R={:.2} F={:.2} M={:.2}",
            label.as_str(),
            stats.customers,
            percentage,
            stats.mean_recency,
            stats.mean_frequency,
            stats.mean_monetary
        )?;
    }
    Ok(())
}

pub fn render_plan<W: Write>(out: &mut W, plan: &PromotionPlan) -> fmt::Result {
    writeln!(out, "=== Promotion Plan ===")?;

    writeln!(out, "\nBundles:")?;
    if plan.bundles.is_empty() {
        writeln!(out, "  (no association rules published)")?;
    }
    for bundle in &plan.bundles {
        writeln!(
            out,
            "  {} + {}  (lift {:.2}, confidence {:.1}%)",
            bundle.main_products, bundle.bundle_products, bundle.lift, bundle.confidence_pct
        )?;
    }

    for label in SegmentLabel::ALL {
        let Some(tier) = plan.tier(label) else { continue };
        writeln!(out, "\n{} ({} total):", label, tier.total)?;
        for customer in &tier.customers {
            writeln!(
                out,
                "  {:<12} R={:<4} F={:<4} M={:.2}",
                customer.rfm.customer_id,
                customer.rfm.recency,
                customer.rfm.frequency,
                customer.rfm.monetary
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apriori::tests::baskets;
    use crate::config::MiningParams;
    use crate::pipeline::analyze_baskets;
    use crate::recommend::plan_promotions;

    #[test]
    fn test_render_rules() {
        let data = baskets(&[&["tea", "sugar"], &["tea", "sugar"], &["bread"]]);
        let params = MiningParams { min_support: 0.5, min_confidence: 0.5 };
        let report = analyze_baskets(&data, &params).unwrap();

        let mut text = String::new();
        render_rules(&mut text, &report, 1).unwrap();
        assert!(text.contains("Rules: 2"));
        assert!(text.contains("... 1 more"));
    }

    #[test]
    fn test_render_empty_rules() {
        let report = analyze_baskets(&[], &MiningParams::default()).unwrap();
        let mut text = String::new();
        render_rules(&mut text, &report, 10).unwrap();
        assert!(text.contains("No rules: the transaction dataset is empty"));
    }

    #[test]
    fn test_render_dataset_stats() {
        let mut text = String::new();
        render_dataset_stats(
            &mut text,
            &DatasetStats {
                transactions: 3,
                customers: 2,
                products: 4,
                revenue: 12.5,
            },
        )
        .unwrap();
        assert!(text.contains("Revenue:      12.50"));
    }

    #[test]
    fn test_render_empty_plan() {
        let mut text = String::new();
        render_plan(&mut text, &plan_promotions(&[], &[])).unwrap();
        assert!(text.contains("(no association rules published)"));
        assert!(text.contains("Best Customers (0 total):"));
    }
}
