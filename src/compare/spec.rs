//! Comparison specification - which category pairs the engine evaluates

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::CompareError;

/// One pairwise comparison: rows where `column == label_a` form the baseline
/// group, rows where `column == label_b` the comparison group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub column: String,
    pub label_a: String,
    pub label_b: String,
    /// Human-readable feature name used in reports
    pub name: String,
}

impl Comparison {
    pub fn new(
        column: impl Into<String>,
        label_a: impl Into<String>,
        label_b: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            label_a: label_a.into(),
            label_b: label_b.into(),
            name: name.into(),
        }
    }
}

/// Ordered list of comparisons
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonSpec {
    entries: Vec<Comparison>,
}

impl ComparisonSpec {
    pub fn new(entries: Vec<Comparison>) -> Self {
        Self { entries }
    }

    /// Comparisons over the listing feature table
    pub fn listing_defaults() -> Self {
        Self::new(vec![
            Comparison::new("room_type", "Private room", "Entire home/apt", "Room type"),
            Comparison::new("neighbourhood_group", "Brooklyn", "Manhattan", "Neighbourhood group"),
            Comparison::new("cancellation_policy", "flexible", "strict", "Cancellation policy"),
            Comparison::new("instant_bookable", "false", "true", "Instant booking"),
            Comparison::new("price_bucket", "below_cutoff", "at_or_above_cutoff", "Price level"),
            Comparison::new(
                "service_fee_bucket",
                "below_median",
                "above_median",
                "Service fee level",
            ),
        ])
    }

    /// Read a JSON array of `{column, label_a, label_b, name}` objects
    pub fn from_json_file(path: &Path) -> Result<Self, CompareError> {
        let text = std::fs::read_to_string(path).map_err(|source| CompareError::SpecIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CompareError::SpecParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Comparison> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ComparisonSpec {
    type Item = &'a Comparison;
    type IntoIter = std::slice::Iter<'a, Comparison>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
