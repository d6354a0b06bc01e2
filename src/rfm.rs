//! RFM feature computation and standardization

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::transaction::TransactionLine;

/// Per-customer Recency, Frequency and Monetary features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRfm {
    pub customer_id: String,
    /// Whole days since the customer's last purchase
    pub recency: u32,
    /// Number of distinct transactions
    pub frequency: u32,
    /// Total spend
    pub monetary: f64,
}

impl CustomerRfm {
    pub fn features(&self) -> [f64; 3] {
        [self.recency as f64, self.frequency as f64, self.monetary]
    }
}

#[derive(Default)]
struct CustomerAccumulator<'a> {
    last_purchase: Option<NaiveDateTime>,
    transactions: HashSet<&'a str>,
    monetary: f64,
}

/// Compute RFM features for every customer in `transactions`.
///
/// Recency is measured in whole days from each customer's most recent
/// purchase to `reference_date`. A reference date earlier than some
/// customer's last purchase is rejected rather than clamped.
///
/// Rows come back ordered by customer id.
pub fn compute_rfm(
    transactions: &[TransactionLine],
    reference_date: NaiveDateTime,
) -> Result<Vec<CustomerRfm>> {
    let mut customers: BTreeMap<&str, CustomerAccumulator> = BTreeMap::new();
    for line in transactions {
        let acc = customers.entry(line.customer_id.as_str()).or_default();
        acc.last_purchase = Some(match acc.last_purchase {
            Some(last) => last.max(line.timestamp),
            None => line.timestamp,
        });
        acc.transactions.insert(line.transaction_id.as_str());
        acc.monetary += line.total;
    }

    customers
        .into_iter()
        .map(|(customer_id, acc)| {
            let last_purchase = acc.last_purchase.ok_or_else(|| {
                AnalysisError::Computation(format!("customer {customer_id} has no purchases"))
            })?;
            if reference_date < last_purchase {
                return Err(AnalysisError::ReferenceBeforeLastPurchase {
                    customer_id: customer_id.to_string(),
                    reference: reference_date,
                    last_purchase,
                });
            }

            let days = (reference_date - last_purchase).num_days();
            let recency = u32::try_from(days).map_err(|_| {
                AnalysisError::Computation(format!("recency of {days} days is out of range"))
            })?;
            let frequency = u32::try_from(acc.transactions.len()).map_err(|_| {
                AnalysisError::Computation(format!(
                    "customer {customer_id} has too many transactions"
                ))
            })?;

            Ok(CustomerRfm {
                customer_id: customer_id.to_string(),
                recency,
                frequency,
                monetary: acc.monetary,
            })
        })
        .collect()
}

/// Build the (n_customers, 3) raw feature matrix
pub fn feature_matrix(rfm: &[CustomerRfm]) -> Array2<f64> {
    let mut matrix = Array2::zeros((rfm.len(), 3));
    for (mut row, customer) in matrix.outer_iter_mut().zip(rfm) {
        row.assign(&Array1::from(customer.features().to_vec()));
    }
    matrix
}

/// Zero-mean, unit-variance scaling fitted per column
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit on the rows of `records` using population variance.
    /// Constant columns get a scale of 1 so they map to all zeros.
    pub fn fit(records: &Array2<f64>) -> Self {
        let n_features = records.ncols();
        if records.nrows() == 0 {
            return Self {
                mean: Array1::zeros(n_features),
                scale: Array1::ones(n_features),
            };
        }

        let mean = records
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let variance = records.var_axis(Axis(0), 0.0);
        let scale = variance
            .iter()
            .zip(mean.iter())
            .map(|(&var, &mu)| {
                let std = var.sqrt();
                if std <= 10.0 * f64::EPSILON * mu.abs().max(1.0) {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn transform(&self, records: &Array2<f64>) -> Array2<f64> {
        (records - &self.mean) / &self.scale
    }

    pub fn fit_transform(records: &Array2<f64>) -> (Self, Array2<f64>) {
        let scaler = Self::fit(records);
        let transformed = scaler.transform(records);
        (scaler, transformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::tests::day;

    #[test]
    fn test_rfm_two_purchases() {
        let lines = vec![
            TransactionLine::new("t1", day(10), "X", "A", 1, 100.0, None),
            TransactionLine::new("t2", day(20), "X", "B", 1, 50.0, None),
        ];
        let rfm = compute_rfm(&lines, day(25)).unwrap();

        assert_eq!(rfm.len(), 1);
        assert_eq!(rfm[0].customer_id, "X");
        assert_eq!(rfm[0].recency, 5);
        assert_eq!(rfm[0].frequency, 2);
        assert_eq!(rfm[0].monetary, 150.0);
    }

    #[test]
    fn test_frequency_counts_distinct_transactions() {
        let lines = vec![
            TransactionLine::new("t1", day(1), "X", "A", 2, 10.0, None),
            TransactionLine::new("t1", day(1), "X", "B", 1, 5.0, None),
            TransactionLine::new("t2", day(3), "Y", "A", 1, 10.0, None),
        ];
        let rfm = compute_rfm(&lines, day(3)).unwrap();

        assert_eq!(rfm.len(), 2);
        assert_eq!(rfm[0].frequency, 1);
        assert_eq!(rfm[0].monetary, 25.0);
        assert_eq!(rfm[0].recency, 2);
        assert_eq!(rfm[1].recency, 0);
    }

    #[test]
    fn test_reference_before_last_purchase() {
        let lines = vec![TransactionLine::new("t1", day(10), "X", "A", 1, 1.0, None)];
        let err = compute_rfm(&lines, day(9)).unwrap_err();
        assert!(matches!(err, AnalysisError::ReferenceBeforeLastPurchase { .. }));
    }

    #[test]
    fn test_recency_truncates_partial_days() {
        let lines = vec![TransactionLine::new("t1", day(10), "X", "A", 1, 1.0, None)];
        let reference = day(12) + chrono::Duration::hours(23);
        assert_eq!(compute_rfm(&lines, reference).unwrap()[0].recency, 2);
    }

    #[test]
    fn test_standard_scaler() {
        let raw = Array2::from_shape_vec(
            (4, 3),
            vec![
                1.0, 1.0, 100.0, //
                30.0, 10.0, 1000.0, //
                10.0, 5.0, 500.0, //
                20.0, 3.0, 750.0,
            ],
        )
        .unwrap();
        let (_, scaled) = StandardScaler::fit_transform(&raw);

        let means = scaled.mean_axis(Axis(0)).unwrap();
        let variances = scaled.var_axis(Axis(0), 0.0);
        for (&mean, &var) in means.iter().zip(variances.iter()) {
            assert!(mean.abs() < 1e-9, "mean {mean}");
            assert!((var - 1.0).abs() < 1e-9, "variance {var}");
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let raw = Array2::from_shape_vec((3, 3), vec![1.0, 5.0, 0.1, 2.0, 5.0, 0.1, 3.0, 5.0, 0.1])
            .unwrap();
        let (scaler, scaled) = StandardScaler::fit_transform(&raw);
        assert_eq!(scaler.scale[1], 1.0);
        assert!(scaled.column(1).iter().all(|&v| v == 0.0));
        assert!(scaled.column(2).iter().all(|&v| v.abs() < 1e-12));
        assert!(scaled.iter().all(|v| v.is_finite()));
    }
}
