//! Level-wise Apriori frequent itemset mining
//!
//! Products are encoded to dense ids in lexicographic order so that every
//! itemset can be kept as a sorted `Vec<u32>`. Candidates of size `k` are
//! joined from frequent `(k-1)`-itemsets with a common `(k-2)`-prefix and
//! discarded before counting unless all of their `(k-1)`-subsets are
//! frequent.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::config::validate_min_support;
use crate::error::Result;
use crate::transaction::Basket;

/// An itemset whose support reached the mining threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequentItemset {
    pub items: BTreeSet<String>,
    /// Fraction of baskets containing every item, in (0, 1]
    pub support: f64,
}

impl FrequentItemset {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Bidirectional mapping between product names and dense ids
struct ItemEncoder {
    names: Vec<String>,
    ids: HashMap<String, u32>,
}

impl ItemEncoder {
    fn fit(baskets: &[Basket]) -> Self {
        let vocabulary: BTreeSet<&String> = baskets.iter().flatten().collect();
        let names: Vec<String> = vocabulary.into_iter().cloned().collect();
        let ids = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), id as u32))
            .collect();
        Self { names, ids }
    }

    fn len(&self) -> usize {
        self.names.len()
    }

    /// Ids come out sorted because basket iteration and id assignment share one order.
    fn encode(&self, basket: &Basket) -> Vec<u32> {
        basket.iter().map(|item| self.ids[item]).collect()
    }

    fn decode(&self, itemset: &[u32]) -> BTreeSet<String> {
        itemset
            .iter()
            .map(|&id| self.names[id as usize].clone())
            .collect()
    }
}

/// Mine every itemset whose support is at least `min_support`.
///
/// # Arguments
/// * `baskets` - One entry per transaction
/// * `min_support` - Threshold in (0, 1]
///
/// # Returns
/// * Frequent itemsets ordered by size, then lexicographically
pub fn mine(baskets: &[Basket], min_support: f64) -> Result<Vec<FrequentItemset>> {
    validate_min_support(min_support)?;
    if baskets.is_empty() {
        return Ok(Vec::new());
    }

    let encoder = ItemEncoder::fit(baskets);
    let encoded: Vec<Vec<u32>> = baskets.iter().map(|b| encoder.encode(b)).collect();
    let n_baskets = encoded.len() as f64;
    let support = |count: usize| count as f64 / n_baskets;

    // Level 1: a single pass over all baskets
    let mut item_counts = vec![0usize; encoder.len()];
    for basket in &encoded {
        for &item in basket {
            item_counts[item as usize] += 1;
        }
    }

    let mut frequent: Vec<(Vec<u32>, f64)> = Vec::new();
    let mut level: Vec<Vec<u32>> = Vec::new();
    for (item, &count) in item_counts.iter().enumerate() {
        if support(count) >= min_support {
            level.push(vec![item as u32]);
            frequent.push((vec![item as u32], support(count)));
        }
    }
    tracing::debug!(level = 1, frequent = level.len(), "apriori level complete");

    let mut k = 2;
    while !level.is_empty() {
        let candidates = generate_candidates(&level);
        if candidates.is_empty() {
            break;
        }

        let counts = count_candidates(&encoded, &candidates);
        let n_candidates = candidates.len();
        level = Vec::new();
        for (candidate, count) in candidates.into_iter().zip(counts) {
            if support(count) >= min_support {
                frequent.push((candidate.clone(), support(count)));
                level.push(candidate);
            }
        }
        tracing::debug!(
            level = k,
            candidates = n_candidates,
            frequent = level.len(),
            "apriori level complete"
        );
        k += 1;
    }

    Ok(frequent
        .into_iter()
        .map(|(itemset, support)| FrequentItemset {
            items: encoder.decode(&itemset),
            support,
        })
        .collect())
}

/// Join frequent `(k-1)`-itemsets sharing their first `k-2` items and keep
/// only candidates whose every `(k-1)`-subset is frequent.
///
/// `level` must be sorted lexicographically, which `mine` guarantees.
fn generate_candidates(level: &[Vec<u32>]) -> Vec<Vec<u32>> {
    let known: HashSet<&[u32]> = level.iter().map(Vec::as_slice).collect();
    let mut candidates = Vec::new();

    for (i, left) in level.iter().enumerate() {
        let prefix = left.len() - 1;
        for right in &level[i + 1..] {
            // Itemsets sharing a prefix are contiguous in sorted order
            if left[..prefix] != right[..prefix] {
                break;
            }
            let mut candidate = left.clone();
            candidate.push(right[prefix]);
            if all_subsets_frequent(&candidate, &known) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn all_subsets_frequent(candidate: &[u32], known: &HashSet<&[u32]>) -> bool {
    let mut subset = Vec::with_capacity(candidate.len() - 1);
    (0..candidate.len()).all(|skip| {
        subset.clear();
        subset.extend(
            candidate
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, &item)| item),
        );
        known.contains(subset.as_slice())
    })
}

fn count_candidates(baskets: &[Vec<u32>], candidates: &[Vec<u32>]) -> Vec<usize> {
    let mut counts = vec![0usize; candidates.len()];
    let size = candidates.first().map_or(0, Vec::len);

    for basket in baskets.iter().filter(|b| b.len() >= size) {
        for (count, candidate) in counts.iter_mut().zip(candidates) {
            if is_sorted_subset(candidate, basket) {
                *count += 1;
            }
        }
    }

    counts
}

/// Subset test on two ascending id lists
fn is_sorted_subset(needle: &[u32], haystack: &[u32]) -> bool {
    let mut rest = haystack.iter();
    needle
        .iter()
        .all(|item| rest.by_ref().any(|candidate| candidate == item))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn baskets(raw: &[&[&str]]) -> Vec<Basket> {
        raw.iter()
            .map(|basket| basket.iter().map(|item| item.to_string()).collect())
            .collect()
    }

    pub(crate) fn itemset(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn support_of(result: &[FrequentItemset], items: &[&str]) -> Option<f64> {
        let wanted = itemset(items);
        result.iter().find(|f| f.items == wanted).map(|f| f.support)
    }

    #[test]
    fn test_mine_reference_baskets() {
        let data = baskets(&[&["A", "B"], &["A", "B", "C"], &["A"], &["B", "C"], &["A", "B"]]);
        let result = mine(&data, 0.3).unwrap();

        assert_eq!(result.len(), 5);
        assert_eq!(support_of(&result, &["A"]), Some(0.8));
        assert_eq!(support_of(&result, &["B"]), Some(0.8));
        assert_eq!(support_of(&result, &["C"]), Some(0.4));
        assert_eq!(support_of(&result, &["A", "B"]), Some(0.6));
        assert_eq!(support_of(&result, &["B", "C"]), Some(0.4));
        assert_eq!(support_of(&result, &["A", "C"]), None);
        assert_eq!(support_of(&result, &["A", "B", "C"]), None);
    }

    #[test]
    fn test_mine_orders_by_size() {
        let data = baskets(&[&["A", "B"], &["A", "B", "C"], &["A"], &["B", "C"], &["A", "B"]]);
        let result = mine(&data, 0.3).unwrap();
        let sizes: Vec<usize> = result.iter().map(FrequentItemset::len).collect();
        assert_eq!(sizes, vec![1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_mine_finds_triples() {
        let data = baskets(&[
            &["milk", "bread", "butter"],
            &["milk", "bread", "butter"],
            &["milk", "bread"],
            &["eggs"],
        ]);
        let result = mine(&data, 0.5).unwrap();
        assert_eq!(support_of(&result, &["bread", "butter", "milk"]), Some(0.5));
        assert_eq!(support_of(&result, &["bread", "milk"]), Some(0.75));
        assert_eq!(support_of(&result, &["eggs"]), None);
    }

    #[test]
    fn test_mine_empty_input() {
        assert!(mine(&[], 0.5).unwrap().is_empty());
    }

    #[test]
    fn test_mine_rejects_invalid_support() {
        let data = baskets(&[&["A"]]);
        assert!(mine(&data, 0.0).unwrap_err().is_validation());
        assert!(mine(&data, 1.2).unwrap_err().is_validation());
        assert!(mine(&data, 1.0).is_ok());
    }

    #[test]
    fn test_candidate_pruning() {
        // {0,1} and {0,2} join to {0,1,2}, but {1,2} is not frequent
        let level = vec![vec![0, 1], vec![0, 2], vec![1, 3]];
        assert!(generate_candidates(&level).is_empty());

        let level = vec![vec![0, 1], vec![0, 2], vec![1, 2]];
        assert_eq!(generate_candidates(&level), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_sorted_subset() {
        assert!(is_sorted_subset(&[1, 3], &[0, 1, 2, 3]));
        assert!(!is_sorted_subset(&[1, 4], &[0, 1, 2, 3]));
        assert!(is_sorted_subset(&[], &[0]));
    }
}
