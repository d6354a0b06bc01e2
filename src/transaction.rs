//! Normalized transaction records and basket grouping

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;

/// Distinct products bought in one transaction
pub type Basket = BTreeSet<String>;

/// One line item of a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionLine {
    pub transaction_id: String,
    pub timestamp: NaiveDateTime,
    pub customer_id: String,
    pub product: String,
    pub quantity: i64,
    pub price: f64,
    pub total: f64,
}

impl TransactionLine {
    /// Build a line item; `total` falls back to `quantity * price`.
    pub fn new(
        transaction_id: impl Into<String>,
        timestamp: NaiveDateTime,
        customer_id: impl Into<String>,
        product: impl Into<String>,
        quantity: i64,
        price: f64,
        total: Option<f64>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            timestamp,
            customer_id: customer_id.into(),
            product: product.into(),
            quantity,
            price,
            total: total.unwrap_or(quantity as f64 * price),
        }
    }
}

/// Group `(transaction_id, product)` pairs into baskets.
/// Repeated products within a transaction collapse to a single entry.
pub fn baskets_from_pairs<I, T, P>(pairs: I) -> Vec<Basket>
where
    I: IntoIterator<Item = (T, P)>,
    T: Into<String>,
    P: Into<String>,
{
    let mut grouped: BTreeMap<String, Basket> = BTreeMap::new();
    for (transaction_id, product) in pairs {
        grouped
            .entry(transaction_id.into())
            .or_default()
            .insert(product.into());
    }
    grouped.into_values().collect()
}

pub fn baskets_from_lines(lines: &[TransactionLine]) -> Vec<Basket> {
    baskets_from_pairs(
        lines
            .iter()
            .map(|line| (line.transaction_id.as_str(), line.product.as_str())),
    )
}

/// Summary counts over a transaction dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetStats {
    pub transactions: usize,
    pub customers: usize,
    pub products: usize,
    pub revenue: f64,
}

pub fn dataset_stats(lines: &[TransactionLine]) -> DatasetStats {
    let transactions: HashSet<&str> = lines.iter().map(|l| l.transaction_id.as_str()).collect();
    let customers: HashSet<&str> = lines.iter().map(|l| l.customer_id.as_str()).collect();
    let products: HashSet<&str> = lines.iter().map(|l| l.product.as_str()).collect();

    DatasetStats {
        transactions: transactions.len(),
        customers: customers.len(),
        products: products.len(),
        revenue: lines.iter().map(|l| l.total).sum(),
    }
}
