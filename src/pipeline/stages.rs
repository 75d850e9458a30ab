//! Named transformation stages and the built-in listing scripts
//!
//! Every built-in script drops and re-creates its own output tables, so a
//! stage can be re-run against the same source without appending.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Ingested raw listings
pub const SOURCE_TABLE: &str = "listings";
/// Cleaned listings written by the `cleaning` stage
pub const CLEAN_TABLE: &str = "listings_clean";
/// Derived feature table read by the comparison engine
pub const FEATURE_TABLE: &str = "listing_features";

/// Built-in stage names, in execution order
pub const STAGE_NAMES: [&str; 3] = ["cleaning", "features", "aggregates"];

pub const DEFAULT_PRICE_CUTOFF: f64 = 500.0;

/// How `service_fee_bucket` splits the service fee
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServiceFeeSplit {
    /// Median of `service_fee` over the cleaned listings
    Median,
    Fixed(f64),
}

impl fmt::Display for ServiceFeeSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceFeeSplit::Median => write!(f, "median"),
            ServiceFeeSplit::Fixed(value) => write!(f, "{}", value),
        }
    }
}

impl FromStr for ServiceFeeSplit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("median") {
            return Ok(ServiceFeeSplit::Median);
        }
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is neither 'median' nor a number", s))?;
        if !value.is_finite() {
            return Err(format!("service fee split must be finite, got {}", s));
        }
        Ok(ServiceFeeSplit::Fixed(value))
    }
}

/// Thresholds of the feature-derivation stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureParams {
    /// `price < price_cutoff` is `below_cutoff`, anything else `at_or_above_cutoff`
    pub price_cutoff: f64,
    /// `service_fee < split` is `below_median`, anything else `above_median`
    pub service_fee_split: ServiceFeeSplit,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            price_cutoff: DEFAULT_PRICE_CUTOFF,
            service_fee_split: ServiceFeeSplit::Median,
        }
    }
}

/// Where a stage's script comes from
#[derive(Debug, Clone, PartialEq)]
pub enum StageSource {
    Inline(String),
    File(PathBuf),
}

/// One named pipeline step
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub source: StageSource,
}

impl Stage {
    pub fn inline(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: StageSource::Inline(script.into()),
        }
    }

    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: StageSource::File(path.into()),
        }
    }

    /// Read the script text. `Ok(None)` means the script file does not exist.
    pub fn load_script(&self) -> std::io::Result<Option<String>> {
        match &self.source {
            StageSource::Inline(script) => Ok(Some(script.clone())),
            StageSource::File(path) => match std::fs::read_to_string(path) {
                Ok(script) => Ok(Some(script)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err),
            },
        }
    }
}

/// The three built-in stages rendered with the given thresholds
pub fn builtin_stages(params: &FeatureParams) -> Vec<Stage> {
    vec![
        Stage::inline(STAGE_NAMES[0], cleaning_script()),
        Stage::inline(STAGE_NAMES[1], features_script(params)),
        Stage::inline(STAGE_NAMES[2], aggregates_script()),
    ]
}

/// Stages read from `<dir>/<stage>.sql`; missing files are skipped at run time
pub fn stages_from_dir(dir: &Path) -> Vec<Stage> {
    STAGE_NAMES
        .iter()
        .map(|name| Stage::from_file(*name, dir.join(format!("{}.sql", name))))
        .collect()
}

/// Normalise labels, cast numerics and drop rows without id or a positive price
pub fn cleaning_script() -> String {
    format!(
        r#"-- cleaning: normalised copy of the raw listings plus data quality counts
DROP TABLE IF EXISTS {clean};
CREATE TABLE {clean} AS
SELECT
    id,
    TRIM(neighbourhood_group) AS neighbourhood_group,
    TRIM(neighbourhood) AS neighbourhood,
    TRIM(room_type) AS room_type,
    LOWER(TRIM(cancellation_policy)) AS cancellation_policy,
    LOWER(CAST(instant_bookable AS VARCHAR)) AS instant_bookable,
    CAST(price AS DOUBLE) AS price,
    CAST(service_fee AS DOUBLE) AS service_fee,
    CAST(number_of_reviews AS DOUBLE) AS number_of_reviews,
    CAST(availability_365 AS DOUBLE) AS availability_365
FROM {source}
WHERE id IS NOT NULL AND price IS NOT NULL AND price > 0;

DROP TABLE IF EXISTS data_quality_metrics;
CREATE TABLE data_quality_metrics AS
SELECT 'cleaning' AS step, 'rows_raw' AS metric_name, CAST(COUNT(*) AS DOUBLE) AS metric_value FROM {source}
UNION ALL
SELECT 'cleaning' AS step, 'rows_clean' AS metric_name, CAST(COUNT(*) AS DOUBLE) AS metric_value FROM {clean}
UNION ALL
SELECT 'cleaning' AS step, 'null_price' AS metric_name, CAST(COUNT(*) - COUNT(price) AS DOUBLE) AS metric_value FROM {source}
UNION ALL
SELECT 'cleaning' AS step, 'null_service_fee' AS metric_name, CAST(COUNT(*) - COUNT(service_fee) AS DOUBLE) AS metric_value FROM {clean}
UNION ALL
SELECT 'cleaning' AS step, 'null_reviews' AS metric_name, CAST(COUNT(*) - COUNT(number_of_reviews) AS DOUBLE) AS metric_value FROM {clean};
"#,
        source = SOURCE_TABLE,
        clean = CLEAN_TABLE,
    )
}

/// Derive `price_bucket` and `service_fee_bucket` from explicit thresholds
pub fn features_script(params: &FeatureParams) -> String {
    let fee_threshold = match params.service_fee_split {
        ServiceFeeSplit::Median => format!(
            "SELECT MEDIAN(service_fee) AS fee_threshold FROM {}",
            CLEAN_TABLE
        ),
        ServiceFeeSplit::Fixed(value) => format!(
            "SELECT CAST({} AS DOUBLE) AS fee_threshold FROM {} LIMIT 1",
            sql_number(value),
            CLEAN_TABLE
        ),
    };

    format!(
        r#"-- features: categorical buckets used as comparison groups
DROP TABLE IF EXISTS {features};
CREATE TABLE {features} AS
WITH fee_split AS (
    {fee_threshold}
)
SELECT
    l.id,
    l.neighbourhood_group,
    l.neighbourhood,
    l.room_type,
    l.cancellation_policy,
    l.instant_bookable,
    l.price,
    l.service_fee,
    CASE
        WHEN l.price < {price_cutoff} THEN 'below_cutoff'
        ELSE 'at_or_above_cutoff'
    END AS price_bucket,
    CASE
        WHEN l.service_fee IS NULL THEN NULL
        WHEN l.service_fee < f.fee_threshold THEN 'below_median'
        ELSE 'above_median'
    END AS service_fee_bucket,
    l.number_of_reviews
FROM {clean} AS l
CROSS JOIN fee_split AS f;
"#,
        features = FEATURE_TABLE,
        clean = CLEAN_TABLE,
        fee_threshold = fee_threshold,
        price_cutoff = sql_number(params.price_cutoff),
    )
}

/// Dashboard aggregates over the feature table
pub fn aggregates_script() -> String {
    format!(
        r#"-- aggregates: precomputed tables for display
DROP TABLE IF EXISTS agg_listings_by_neighbourhood;
CREATE TABLE agg_listings_by_neighbourhood AS
SELECT
    neighbourhood,
    COUNT(*) AS total_listings,
    ROUND(AVG(price), 2) AS avg_price,
    ROUND(AVG(number_of_reviews), 2) AS avg_reviews
FROM {features}
GROUP BY neighbourhood
ORDER BY total_listings DESC, neighbourhood;

DROP TABLE IF EXISTS agg_listings_by_roomtype;
CREATE TABLE agg_listings_by_roomtype AS
SELECT
    room_type,
    COUNT(*) AS total_listings,
    ROUND(AVG(price), 2) AS avg_price
FROM {features}
GROUP BY room_type
ORDER BY room_type;

DROP TABLE IF EXISTS agg_price_distribution;
CREATE TABLE agg_price_distribution AS
SELECT
    price_band,
    price_range,
    COUNT(*) AS listings
FROM (
    SELECT
        CASE
            WHEN price < 200 THEN 1
            WHEN price < 400 THEN 2
            WHEN price < 600 THEN 3
            WHEN price < 800 THEN 4
            WHEN price < 1000 THEN 5
            ELSE 6
        END AS price_band,
        CASE
            WHEN price < 200 THEN '0-199'
            WHEN price < 400 THEN '200-399'
            WHEN price < 600 THEN '400-599'
            WHEN price < 800 THEN '600-799'
            WHEN price < 1000 THEN '800-999'
            ELSE '1000+'
        END AS price_range
    FROM {features}
) AS banded
GROUP BY price_band, price_range
ORDER BY price_band;

DROP TABLE IF EXISTS ab_group_summary;
CREATE TABLE ab_group_summary AS
SELECT
    ab_group,
    COUNT(*) AS n_listings,
    ROUND(AVG(price), 2) AS avg_price,
    ROUND(AVG(number_of_reviews), 2) AS avg_reviews,
    ROUND(AVG(has_review), 4) AS conv_rate
FROM (
    SELECT
        price_bucket AS ab_group,
        price,
        number_of_reviews,
        CASE WHEN number_of_reviews > 0 THEN 1.0 ELSE 0.0 END AS has_review
    FROM {features}
) AS grouped
GROUP BY ab_group
ORDER BY ab_group;
"#,
        features = FEATURE_TABLE,
    )
}

/// Render a float so SQL always reads it as a decimal literal
/// Float literal for SQL. Polars reads a number without a `.` as an
/// integer, so the mantissa always carries one (`1.0e20`, not `1e20`).
fn sql_number(value: f64) -> String {
    let text = format!("{:?}", value);
    if text.contains('.') {
        return text;
    }
    match text.split_once('e') {
        Some((mantissa, exponent)) => format!("{mantissa}.0e{exponent}"),
        None => format!("{text}.0"),
    }
}
