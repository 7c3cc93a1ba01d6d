//! Group deal rows by fund manager.
//!
//! Each row's manager list is split on `", "` and deduplicated, the row is
//! exploded into one (row, manager) pair per unique manager, and the pairs
//! are grouped by name.
//!
//! ```text
//! Deal rows                          →  Manager summaries
//! ┌──────────────────────────┐         ┌──────────────────────────┐
//! │ "A, B"          amt: 10  │         │ A   count: 3   total: 17 │
//! │ "B, A"          amt: 5   │    →    │ B   count: 2   total: 15 │
//! │ "A"             amt: 2   │         └──────────────────────────┘
//! └──────────────────────────┘
//! ```
//!
//! A row's full amount is credited to every manager in it; amounts are not
//! split between co-investors. Output is sorted by manager name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AggregateError, AggregateResult};
use crate::models::{AmountCell, DealRecord, ManagerSummary};
use crate::parser::ParseResult;

/// What to do with amount cells that are not numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountPolicy {
    /// Missing and non-numeric amounts count as 0.
    #[default]
    Lenient,
    /// Missing amounts count as 0; a non-numeric amount fails the run.
    Strict,
}

/// Output of one aggregation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// One row per unique manager, sorted by name.
    pub summaries: Vec<ManagerSummary>,
    /// Column the manager lists were read from.
    pub manager_column: String,
    /// Column the amounts were summed from, if any.
    pub amount_column: Option<String>,
    /// Data rows read.
    pub rows_read: usize,
    /// Rows whose manager cell was missing or empty.
    pub rows_without_managers: usize,
    /// Rows with managers whose amount was missing or non-numeric.
    pub amounts_defaulted: usize,
}

impl AggregationResult {
    /// Whether totals were computed.
    pub fn has_amount(&self) -> bool {
        self.amount_column.is_some()
    }

    /// Number of unique managers.
    pub fn manager_count(&self) -> usize {
        self.summaries.len()
    }

    /// Sum of all participation counts (the size of the exploded set).
    pub fn total_participations(&self) -> usize {
        self.summaries.iter().map(|s| s.participation_count).sum()
    }

    /// Look up a manager's summary by exact name.
    pub fn get(&self, manager: &str) -> Option<&ManagerSummary> {
        self.summaries.iter().find(|s| s.fund_manager == manager)
    }
}

/// Read every row of `table` into a [`DealRecord`].
pub fn deal_records(
    table: &ParseResult,
    manager_column: &str,
    amount_column: Option<&str>,
) -> AggregateResult<Vec<DealRecord>> {
    ensure_column(table, manager_column)?;
    if let Some(column) = amount_column {
        ensure_column(table, column)?;
    }

    let records = (0..table.records.len())
        .map(|i| {
            DealRecord::from_cells(
                i + 1,
                table.cell(i, manager_column),
                amount_column.and_then(|c| table.cell(i, c)),
            )
        })
        .collect();

    Ok(records)
}

/// Aggregate participation counts (and totals, when `amount_column` is set)
/// per fund manager.
pub fn aggregate(
    table: &ParseResult,
    manager_column: &str,
    amount_column: Option<&str>,
    policy: AmountPolicy,
) -> AggregateResult<AggregationResult> {
    let records = deal_records(table, manager_column, amount_column)?;
    aggregate_records(&records, manager_column, amount_column, policy)
}

/// Group already-split deal records by manager.
///
/// `manager_column` is only recorded in the result; the records already hold
/// the split manager lists.
pub fn aggregate_records(
    records: &[DealRecord],
    manager_column: &str,
    amount_column: Option<&str>,
    policy: AmountPolicy,
) -> AggregateResult<AggregationResult> {
    let mut groups: BTreeMap<&str, ManagerAccumulator> = BTreeMap::new();
    let mut rows_without_managers = 0;
    let mut amounts_defaulted = 0;

    for record in records {
        if record.managers.is_empty() {
            rows_without_managers += 1;
            continue;
        }

        let amount = match amount_column {
            Some(column) => {
                if let (AmountCell::Invalid(value), AmountPolicy::Strict) = (&record.amount, policy) {
                    return Err(AggregateError::InvalidAmount {
                        row: record.row,
                        column: column.to_string(),
                        value: value.clone(),
                    });
                }
                if !matches!(record.amount, AmountCell::Value(_)) {
                    amounts_defaulted += 1;
                }
                record.amount.value_or_zero()
            }
            None => 0.0,
        };

        for manager in &record.managers {
            groups.entry(manager.as_str()).or_default().add(amount);
        }
    }

    let has_amount = amount_column.is_some();
    let summaries = groups
        .into_iter()
        .map(|(name, acc)| acc.build(name, has_amount))
        .collect();

    Ok(AggregationResult {
        summaries,
        manager_column: manager_column.to_string(),
        amount_column: amount_column.map(String::from),
        rows_read: records.len(),
        rows_without_managers,
        amounts_defaulted,
    })
}

fn ensure_column(table: &ParseResult, column: &str) -> AggregateResult<()> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(AggregateError::ColumnNotFound(column.to_string()))
    }
}

/// Running count and total for one manager.
#[derive(Default)]
struct ManagerAccumulator {
    count: usize,
    total: f64,
}

impl ManagerAccumulator {
    fn add(&mut self, amount: f64) {
        self.count += 1;
        self.total += amount;
    }

    fn build(self, name: &str, has_amount: bool) -> ManagerSummary {
        ManagerSummary {
            fund_manager: name.to_string(),
            participation_count: self.count,
            total_amount_raised: has_amount.then_some(self.total),
        }
    }
}
