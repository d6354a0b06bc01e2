//! Promotion planning from published rules and segments

use serde::Serialize;

use crate::rules::{round_to, RuleRecord};
use crate::segment::{CustomerSegment, SegmentLabel};

/// Number of bundle suggestions and customers listed per tier
pub const PLAN_LIMIT: usize = 10;

/// A product bundle suggested by an association rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleSuggestion {
    pub main_products: String,
    pub bundle_products: String,
    /// Lift rounded to two decimals
    pub lift: f64,
    /// Confidence as a percentage rounded to one decimal
    pub confidence_pct: f64,
}

/// Customers of one tier to target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierTargets {
    pub label: SegmentLabel,
    /// First customers of the tier by customer id
    pub customers: Vec<CustomerSegment>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionPlan {
    pub bundles: Vec<BundleSuggestion>,
    /// One entry per tier, Best first
    pub targets: Vec<TierTargets>,
}

impl PromotionPlan {
    pub fn tier(&self, label: SegmentLabel) -> Option<&TierTargets> {
        self.targets.iter().find(|t| t.label == label)
    }
}

/// Build bundle suggestions from the highest-lift rules and target lists per tier
pub fn plan_promotions(rules: &[RuleRecord], segments: &[CustomerSegment]) -> PromotionPlan {
    let mut by_lift: Vec<&RuleRecord> = rules.iter().collect();
    by_lift.sort_by(|a, b| b.lift.total_cmp(&a.lift));

    let bundles = by_lift
        .into_iter()
        .take(PLAN_LIMIT)
        .map(|rule| BundleSuggestion {
            main_products: rule.antecedents.clone(),
            bundle_products: rule.consequents.clone(),
            lift: round_to(rule.lift, 2),
            confidence_pct: round_to(rule.confidence * 100.0, 1),
        })
        .collect();

    let targets = SegmentLabel::ALL
        .iter()
        .map(|&label| {
            let mut members: Vec<&CustomerSegment> =
                segments.iter().filter(|s| s.label == label).collect();
            members.sort_by(|a, b| a.rfm.customer_id.cmp(&b.rfm.customer_id));
            TierTargets {
                label,
                total: members.len(),
                customers: members.into_iter().take(PLAN_LIMIT).cloned().collect(),
            }
        })
        .collect();

    PromotionPlan { bundles, targets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::tests::customer;

    fn rule(name: &str, confidence: f64, lift: f64) -> RuleRecord {
        RuleRecord {
            antecedents: name.to_string(),
            consequents: "X".to_string(),
            support: 0.1,
            confidence,
            lift,
        }
    }

    #[test]
    fn test_bundles_by_lift() {
        let rules: Vec<RuleRecord> = (0..12)
            .map(|i| rule(&format!("r{i}"), 0.5, 1.0 + i as f64 / 10.0))
            .collect();
        let plan = plan_promotions(&rules, &[]);

        assert_eq!(plan.bundles.len(), PLAN_LIMIT);
        assert_eq!(plan.bundles[0].main_products, "r11");
        assert_eq!(plan.bundles[0].lift, 2.1);
        assert_eq!(plan.bundles[0].confidence_pct, 50.0);
        assert!(plan.bundles.windows(2).all(|w| w[0].lift >= w[1].lift));
    }

    #[test]
    fn test_targets_sorted_by_customer_id() {
        let segments: Vec<CustomerSegment> = ["c3", "c1", "c2"]
            .iter()
            .map(|id| CustomerSegment {
                rfm: customer(id, 1, 1, 1.0),
                cluster_id: 0,
                label: SegmentLabel::Best,
            })
            .collect();
        let plan = plan_promotions(&[], &segments);

        let best = plan.tier(SegmentLabel::Best).unwrap();
        assert_eq!(best.total, 3);
        let ids: Vec<&str> = best.customers.iter().map(|c| c.rfm.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(plan.tier(SegmentLabel::Lost).unwrap().total, 0);
        assert!(plan.bundles.is_empty());
    }
}
