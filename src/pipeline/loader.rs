//! Dataset loader for CSV and Parquet listing files

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;

/// Columns holding currency strings such as `"$1,060 "`
pub const CURRENCY_COLUMNS: [&str; 2] = ["price", "service_fee"];

/// Row and size statistics collected while ingesting a file
#[derive(Debug, Clone, PartialEq)]
pub struct IngestStats {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub columns: usize,
    pub memory_mb: f64,
}

impl IngestStats {
    pub fn duplicates_removed(&self) -> usize {
        self.rows_read - self.rows_loaded
    }
}

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    Ok(lf)
}

/// Read a raw listings file and return the normalised table ready for the store
pub fn ingest_listings(path: &Path, infer_schema_length: usize) -> Result<(DataFrame, IngestStats)> {
    let raw = load_dataset(path, infer_schema_length)?
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    let rows_read = raw.height();

    let df = prepare_listings(raw)?;
    let stats = IngestStats {
        rows_read,
        rows_loaded: df.height(),
        columns: df.width(),
        memory_mb: df.estimated_size() as f64 / (1024.0 * 1024.0),
    };
    Ok((df, stats))
}

/// Normalise column names, parse currency columns and drop exact duplicate rows.
///
/// Row order is preserved (first occurrence of a duplicate wins) so that
/// ingesting the same file twice yields the same table.
pub fn prepare_listings(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| normalize_column_name(name.as_str()))
        .collect();
    df.set_column_names(names.iter().map(String::as_str))
        .context("Column names collide after normalisation")?;

    for name in CURRENCY_COLUMNS {
        if let Ok(column) = df.column(name) {
            let cleaned = clean_currency_column(column)
                .with_context(|| format!("Failed to parse currency column '{}'", name))?;
            df.with_column(cleaned)?;
        }
    }

    let df = df
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()
        .context("Failed to remove duplicate rows")?;

    Ok(df)
}

/// `" Room Type "` -> `"room_type"`
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Parse a currency string, ignoring `$`, thousands separators and whitespace.
/// Returns `None` for empty or unparseable input.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn clean_currency_column(column: &Column) -> Result<Column> {
    let name = column.name().clone();
    if column.dtype().is_primitive_numeric() {
        return Ok(column.cast(&DataType::Float64)?);
    }

    let text = column.cast(&DataType::String)?;
    let values: Vec<Option<f64>> = text
        .as_materialized_series()
        .str()?
        .iter()
        .map(|v| v.and_then(parse_currency))
        .collect();
    Ok(Column::new(name, values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("room type"), "room_type");
        assert_eq!(normalize_column_name("  NAME "), "name");
        assert_eq!(normalize_column_name("availability 365"), "availability_365");
        assert_eq!(normalize_column_name("neighbourhood  group"), "neighbourhood_group");
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$1,060 "), Some(1060.0));
        assert_eq!(parse_currency("$193"), Some(193.0));
        assert_eq!(parse_currency("42.5"), Some(42.5));
        assert_eq!(parse_currency(""), None);
        assert_eq!(parse_currency("  $ "), None);
        assert_eq!(parse_currency("n/a"), None);
    }

    #[test]
    fn test_numeric_currency_column_is_cast() {
        let column = Column::new("price".into(), vec![10i64, 20, 30]);
        let cleaned = clean_currency_column(&column).unwrap();
        assert_eq!(cleaned.dtype(), &DataType::Float64);
    }
}
