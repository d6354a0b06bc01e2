//! Association rule derivation from frequent itemsets

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::apriori::FrequentItemset;
use crate::config::validate_min_confidence;
use crate::error::{AnalysisError, Result};

/// Rules at or below this lift are independent or negatively associated
pub const MIN_LIFT: f64 = 1.0;

/// Largest itemset whose antecedents can be enumerated by bitmask
const MAX_RULE_ITEMS: usize = 63;

/// A directional rule `antecedent -> consequent`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRule {
    pub antecedent: BTreeSet<String>,
    pub consequent: BTreeSet<String>,
    /// Joint support of antecedent and consequent
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

impl AssociationRule {
    pub fn to_record(&self) -> RuleRecord {
        RuleRecord {
            antecedents: join_items(&self.antecedent),
            consequents: join_items(&self.consequent),
            support: round_to(self.support, 4),
            confidence: round_to(self.confidence, 4),
            lift: round_to(self.lift, 4),
        }
    }
}

/// Display/persistence form of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub antecedents: String,
    pub consequents: String,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
}

pub fn join_items(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Derive every rule with confidence >= `min_confidence` and lift > 1.
///
/// Rules are ordered by confidence, then lift, both descending; remaining
/// ties fall back to the antecedent and consequent item lists so the order
/// is fully deterministic.
pub fn generate_rules(
    itemsets: &[FrequentItemset],
    min_confidence: f64,
) -> Result<Vec<AssociationRule>> {
    validate_min_confidence(min_confidence)?;

    let supports: HashMap<&BTreeSet<String>, f64> =
        itemsets.iter().map(|f| (&f.items, f.support)).collect();
    let lookup = |items: &BTreeSet<String>| -> Result<f64> {
        match supports.get(items) {
            Some(&support) if support > 0.0 => Ok(support),
            Some(_) => Err(AnalysisError::Computation(format!(
                "zero support for itemset {{{}}}",
                join_items(items)
            ))),
            None => Err(AnalysisError::Computation(format!(
                "subset {{{}}} of a frequent itemset is missing from the frequent set",
                join_items(items)
            ))),
        }
    };

    let mut rules = Vec::new();
    for itemset in itemsets.iter().filter(|f| f.len() >= 2) {
        let items: Vec<&String> = itemset.items.iter().collect();
        if items.len() > MAX_RULE_ITEMS {
            return Err(AnalysisError::Computation(format!(
                "itemset of {} items is too large for rule enumeration",
                items.len()
            )));
        }

        let full: u64 = (1u64 << items.len()) - 1;
        for mask in 1..full {
            let (antecedent, consequent) = split_by_mask(&items, mask);
            let confidence = itemset.support / lookup(&antecedent)?;
            let lift = confidence / lookup(&consequent)?;
            if !(confidence.is_finite() && lift.is_finite()) {
                return Err(AnalysisError::Computation(format!(
                    "non-finite score for rule {{{}}} -> {{{}}}",
                    join_items(&antecedent),
                    join_items(&consequent)
                )));
            }

            if confidence >= min_confidence && lift > MIN_LIFT {
                rules.push(AssociationRule {
                    antecedent,
                    consequent,
                    support: itemset.support,
                    confidence,
                    lift,
                });
            }
        }
    }

    rules.sort_by(compare_rules);
    Ok(rules)
}

fn split_by_mask(items: &[&String], mask: u64) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut antecedent = BTreeSet::new();
    let mut consequent = BTreeSet::new();
    for (bit, &item) in items.iter().enumerate() {
        if mask & (1 << bit) != 0 {
            antecedent.insert(item.clone());
        } else {
            consequent.insert(item.clone());
        }
    }
    (antecedent, consequent)
}

fn compare_rules(a: &AssociationRule, b: &AssociationRule) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.lift.total_cmp(&a.lift))
        .then_with(|| a.antecedent.cmp(&b.antecedent))
        .then_with(|| a.consequent.cmp(&b.consequent))
}
