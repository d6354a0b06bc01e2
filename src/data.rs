//! Transaction dataset loading using Polars
//!
//! Normalizes a CSV export into [`TransactionLine`] records. Only
//! `transaction_id`, `date`, `customer_id` and `product` are required;
//! `quantity` defaults to 1, `price` to 0 and `total` to `quantity * price`.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::{AnalysisError, Result};
use crate::transaction::TransactionLine;

const REQUIRED_COLUMNS: [&str; 4] = ["transaction_id", "date", "customer_id", "product"];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Load a CSV file of line items
///
/// # Arguments
/// * `path` - CSV file with a header row
///
/// # Returns
/// * One `TransactionLine` per data row, in file order
pub fn load_transactions(path: impl AsRef<Path>) -> Result<Vec<TransactionLine>> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let lines = transactions_from_frame(df)?;
    tracing::info!(path = %path.display(), rows = lines.len(), "loaded transactions");
    Ok(lines)
}

/// Convert an already loaded DataFrame into line items
pub fn transactions_from_frame(df: DataFrame) -> Result<Vec<TransactionLine>> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::MissingColumn(missing));
    }

    let has_quantity = df.column("quantity").is_ok();
    let has_price = df.column("price").is_ok();
    let has_total = df.column("total").is_ok();

    // Fill in optional columns; null cells get the same defaults
    let mut frame = df.lazy();
    frame = if has_quantity {
        frame.with_column(col("quantity").cast(DataType::Int64).fill_null(lit(1i64)))
    } else {
        frame.with_column(lit(1i64).alias("quantity"))
    };
    frame = if has_price {
        frame.with_column(col("price").cast(DataType::Float64).fill_null(lit(0.0f64)))
    } else {
        frame.with_column(lit(0.0f64).alias("price"))
    };
    let line_total = col("quantity").cast(DataType::Float64) * col("price");
    frame = if has_total {
        frame.with_column(col("total").cast(DataType::Float64).fill_null(line_total))
    } else {
        frame.with_column(line_total.alias("total"))
    };
    let df = frame.collect()?;

    let transaction_ids = string_column(&df, "transaction_id")?;
    let dates = string_column(&df, "date")?;
    let customer_ids = string_column(&df, "customer_id")?;
    let products = string_column(&df, "product")?;
    let quantities = int_column(&df, "quantity")?;
    let prices = float_column(&df, "price")?;
    let totals = float_column(&df, "total")?;

    let mut lines = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row = i + 1;
        let raw_date = required(dates[i].as_deref(), row, "date")?;
        let timestamp = parse_timestamp(raw_date).ok_or_else(|| AnalysisError::InvalidTimestamp {
            row,
            value: raw_date.to_string(),
        })?;

        lines.push(TransactionLine::new(
            required(transaction_ids[i].as_deref(), row, "transaction_id")?,
            timestamp,
            required(customer_ids[i].as_deref(), row, "customer_id")?,
            required(products[i].as_deref(), row, "product")?,
            required(quantities[i], row, "quantity")?,
            required(prices[i], row, "price")?,
            totals[i],
        ));
    }

    Ok(lines)
}

/// Parse the timestamp formats accepted in `date` columns and reference dates.
/// Offsets in RFC 3339 input are normalized to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn required<T>(value: Option<T>, row: usize, column: &'static str) -> Result<T> {
    value.ok_or(AnalysisError::MissingValue { row, column })
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|value| value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect())
}

fn int_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = df.column(name)?.cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}
