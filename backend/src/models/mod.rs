//! Domain models for the participation counter.
//!
//! - [`DealRecord`] - one input row, reduced to its managers and amount
//! - [`AmountCell`] - the amount cell of a row, as read from the CSV
//! - [`ManagerSummary`] - one output row, per unique fund manager

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::parser::is_missing;

/// Separator between manager names inside a manager list cell.
pub const MANAGER_SEPARATOR: &str = ", ";

// =============================================================================
// Input
// =============================================================================

/// Amount cell of a deal row.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountCell {
    /// Empty cell or an NA token.
    Missing,
    /// Parsed numeric value.
    Value(f64),
    /// Present but not a finite number.
    Invalid(String),
}

impl AmountCell {
    /// Read an amount from a raw cell.
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = match raw {
            Some(r) if !is_missing(r) => r.trim(),
            _ => return AmountCell::Missing,
        };

        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => AmountCell::Value(v),
            _ => AmountCell::Invalid(raw.to_string()),
        }
    }

    /// The value to add to a manager's total when missing counts as zero.
    pub fn value_or_zero(&self) -> f64 {
        match self {
            AmountCell::Value(v) => *v,
            AmountCell::Missing | AmountCell::Invalid(_) => 0.0,
        }
    }
}

/// One deal row after its manager list has been split and deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct DealRecord {
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// Unique managers named in the row, in first-seen order.
    pub managers: Vec<String>,
    /// Amount cell, `Missing` when no amount column is aggregated.
    pub amount: AmountCell,
}

impl DealRecord {
    /// Build a record from the raw manager and amount cells.
    pub fn from_cells(row: usize, manager_cell: Option<&str>, amount_cell: Option<&str>) -> Self {
        Self {
            row,
            managers: split_managers(manager_cell),
            amount: AmountCell::parse(amount_cell),
        }
    }
}

/// Split a manager list cell into unique manager names.
///
/// Missing cells yield an empty list. Names are compared exactly
/// (case-sensitive, untrimmed). Empty fragments are dropped.
pub fn split_managers(cell: Option<&str>) -> Vec<String> {
    let cell = match cell {
        Some(c) if !is_missing(c) => c,
        _ => return Vec::new(),
    };

    let mut seen = HashSet::new();
    cell.split(MANAGER_SEPARATOR)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(*name))
        .map(String::from)
        .collect()
}

// =============================================================================
// Output
// =============================================================================

/// Aggregated participation of one fund manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSummary {
    /// Manager name, unique across the output.
    pub fund_manager: String,
    /// Number of distinct rows naming this manager.
    pub participation_count: usize,
    /// Sum of the amount column over those rows, when one was selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount_raised: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_list() {
        assert_eq!(split_managers(Some("A, B")), vec!["A", "B"]);
    }

    #[test]
    fn test_split_dedups_within_row() {
        assert_eq!(split_managers(Some("A, A")), vec!["A"]);
        assert_eq!(split_managers(Some("B, A, B")), vec!["B", "A"]);
    }

    #[test]
    fn test_split_is_case_sensitive() {
        assert_eq!(split_managers(Some("Acme, acme")), vec!["Acme", "acme"]);
    }

    #[test]
    fn test_split_only_on_comma_space() {
        // A bare comma is part of the name.
        assert_eq!(split_managers(Some("Foo,Bar, Baz")), vec!["Foo,Bar", "Baz"]);
    }

    #[test]
    fn test_split_missing_cell() {
        assert!(split_managers(None).is_empty());
        assert!(split_managers(Some("")).is_empty());
        assert!(split_managers(Some("NaN")).is_empty());
    }

    #[test]
    fn test_split_drops_empty_fragments() {
        assert_eq!(split_managers(Some("A, , B")), vec!["A", "B"]);
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(AmountCell::parse(Some("10")), AmountCell::Value(10.0));
        assert_eq!(AmountCell::parse(Some(" 2.5 ")), AmountCell::Value(2.5));
        assert_eq!(AmountCell::parse(Some("")), AmountCell::Missing);
        assert_eq!(AmountCell::parse(None), AmountCell::Missing);
        assert_eq!(AmountCell::parse(Some("N/A")), AmountCell::Missing);
        assert_eq!(
            AmountCell::parse(Some("£5m")),
            AmountCell::Invalid("£5m".to_string())
        );
        assert_eq!(
            AmountCell::parse(Some("inf")),
            AmountCell::Invalid("inf".to_string())
        );
    }

    #[test]
    fn test_value_or_zero() {
        assert_eq!(AmountCell::Value(3.0).value_or_zero(), 3.0);
        assert_eq!(AmountCell::Missing.value_or_zero(), 0.0);
        assert_eq!(AmountCell::Invalid("x".into()).value_or_zero(), 0.0);
    }

    #[test]
    fn test_summary_serialization_omits_missing_total() {
        let summary = ManagerSummary {
            fund_manager: "A".into(),
            participation_count: 2,
            total_amount_raised: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["fundManager"], "A");
        assert_eq!(json["participationCount"], 2);
        assert!(json.get("totalAmountRaised").is_none());
    }
}
