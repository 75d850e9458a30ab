//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use staylift::pipeline::{TableStore, SOURCE_TABLE};

/// Raw listings as exported by the listings site: spaced headers, currency
/// strings, a duplicated row (id 3) and a row without a price (id 9).
pub const RAW_LISTINGS_CSV: &str = "\
id,NAME,neighbourhood group,neighbourhood,instant_bookable,cancellation_policy,room type,price,service fee,number of reviews,availability 365
1,Cozy loft,Brooklyn,Williamsburg,TRUE,flexible,Private room,$120 ,$24 ,10,200
2,Sunny flat,Manhattan,Harlem,FALSE,strict,Entire home/apt,\"$1,060 \",$212 ,45,120
3,Quiet room,Brooklyn,Bushwick,TRUE,moderate,Private room,$499 ,$100 ,3,300
3,Quiet room,Brooklyn,Bushwick,TRUE,moderate,Private room,$499 ,$100 ,3,300
4,Park view,Manhattan,Chelsea,FALSE,flexible,Entire home/apt,$500 ,$100 ,0,90
5,Garden suite,Queens,Astoria,TRUE,strict,Entire home/apt,$750 ,,22,45
6,Studio,Manhattan,Harlem,FALSE,strict,Private room,$80 ,$16 ,7,365
7,Brownstone,Brooklyn,Bushwick,TRUE,flexible,Entire home/apt,$640 ,$128 ,31,10
8,Attic,Bronx,Fordham,FALSE,moderate,Shared room,$55 ,$11 ,1,180
9,No price,Queens,Astoria,TRUE,flexible,Private room,,$20 ,4,100
";

/// Typed listings as produced by ingestion (normalised names, numeric prices)
pub fn create_listings_dataframe() -> DataFrame {
    df! {
        "id" => [1i64, 2, 3, 4, 5, 6, 7, 8],
        "neighbourhood_group" => ["Brooklyn", "Manhattan", "Brooklyn", "Manhattan", "Queens", "Manhattan", "Brooklyn", "Bronx"],
        "neighbourhood" => ["Williamsburg", "Harlem", "Bushwick", "Chelsea", "Astoria", "Harlem", "Bushwick", "Fordham"],
        "instant_bookable" => [true, false, true, false, true, false, true, false],
        "cancellation_policy" => ["flexible", "strict", "moderate", "flexible", "strict", "strict", "flexible", "moderate"],
        "room_type" => ["Private room", "Entire home/apt", "Private room", "Entire home/apt", "Entire home/apt", "Private room", "Entire home/apt", "Shared room"],
        "price" => [120.0f64, 1060.0, 499.0, 500.0, 750.0, 80.0, 640.0, 55.0],
        "service_fee" => [Some(24.0f64), Some(212.0), Some(100.0), Some(100.0), None, Some(16.0), Some(128.0), Some(11.0)],
        "number_of_reviews" => [10i64, 45, 3, 0, 22, 7, 31, 1],
        "availability_365" => [200i64, 120, 300, 90, 45, 365, 10, 180],
    }
    .unwrap()
}

/// Feature-table shaped frame with `n` rows, deterministic values
pub fn create_feature_dataframe(n: usize) -> DataFrame {
    let room_types = ["Private room", "Entire home/apt", "Shared room"];
    let groups = ["Brooklyn", "Manhattan", "Queens"];
    let policies = ["flexible", "strict", "moderate"];

    let room_type: Vec<&str> = (0..n).map(|i| room_types[i % 3]).collect();
    let neighbourhood_group: Vec<&str> = (0..n).map(|i| groups[(i / 3) % 3]).collect();
    let cancellation_policy: Vec<&str> = (0..n).map(|i| policies[(i / 2) % 3]).collect();
    let instant_bookable: Vec<&str> = (0..n)
        .map(|i| if i % 4 == 0 { "true" } else { "false" })
        .collect();
    let price_bucket: Vec<&str> = (0..n)
        .map(|i| if i % 5 < 2 { "at_or_above_cutoff" } else { "below_cutoff" })
        .collect();
    let service_fee_bucket: Vec<&str> = (0..n)
        .map(|i| if i % 2 == 0 { "above_median" } else { "below_median" })
        .collect();
    let reviews: Vec<f64> = (0..n)
        .map(|i| ((i * 7919) % 53) as f64 + if i % 3 == 1 { 8.0 } else { 0.0 })
        .collect();

    df! {
        "room_type" => room_type,
        "neighbourhood_group" => neighbourhood_group,
        "cancellation_policy" => cancellation_policy,
        "instant_bookable" => instant_bookable,
        "price_bucket" => price_bucket,
        "service_fee_bucket" => service_fee_bucket,
        "number_of_reviews" => reviews,
    }
    .unwrap()
}

/// Write [`RAW_LISTINGS_CSV`] into a fresh temporary directory
pub fn create_raw_listings_csv() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("listings.csv");
    std::fs::write(&csv_path, RAW_LISTINGS_CSV).unwrap();
    (temp_dir, csv_path)
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// In-memory store holding the typed listings as source table
pub fn create_loaded_store() -> TableStore {
    let mut store = TableStore::in_memory();
    store
        .load_source(SOURCE_TABLE, create_listings_dataframe())
        .unwrap();
    store
}

/// Directory-backed store holding the typed listings as source table
pub fn create_loaded_store_on_disk() -> (TempDir, TableStore) {
    let temp_dir = TempDir::new().unwrap();
    let mut store = TableStore::open(&temp_dir.path().join("store")).unwrap();
    store
        .load_source(SOURCE_TABLE, create_listings_dataframe())
        .unwrap();
    (temp_dir, store)
}

/// Column values as strings, nulls as `None`
pub fn string_values(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    let column = df.column(column).unwrap().cast(&DataType::String).unwrap();
    column
        .as_materialized_series()
        .str()
        .unwrap()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

/// Column values as f64, nulls as `None`
pub fn f64_values(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
    let column = df.column(column).unwrap().cast(&DataType::Float64).unwrap();
    column
        .as_materialized_series()
        .f64()
        .unwrap()
        .iter()
        .collect()
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}
