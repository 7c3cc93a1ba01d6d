//! Column selection for the upload shells.
//!
//! The HTTP API and the CLI let the user pick which column holds the manager
//! lists and which (if any) holds the amounts. This module owns the default
//! picks and checks the choices against the parsed header before anything is
//! aggregated.

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;

/// Manager list column picked when present in the header.
pub const DEFAULT_MANAGER_COLUMN: &str = "Fundraising investors - Fund manager";

/// Amount column picked when present in the header.
pub const DEFAULT_AMOUNT_COLUMN: &str = "Amount raised (converted to GBP)";

/// The default manager column: the well-known name if present, else the first column.
pub fn default_manager_column(headers: &[String]) -> Option<String> {
    headers
        .iter()
        .find(|h| h.as_str() == DEFAULT_MANAGER_COLUMN)
        .or_else(|| headers.first())
        .cloned()
}

/// The default amount column: the well-known name if present.
pub fn default_amount_column(headers: &[String]) -> Option<String> {
    headers
        .iter()
        .find(|h| h.as_str() == DEFAULT_AMOUNT_COLUMN)
        .cloned()
}

/// How the amount column is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "column", rename_all = "camelCase")]
pub enum AmountSelection {
    /// Use [`DEFAULT_AMOUNT_COLUMN`] if the header has it, otherwise no amounts.
    #[default]
    Default,
    /// Sum this column.
    Column(String),
    /// Only count participations.
    Disabled,
}

impl AmountSelection {
    /// Interpret a form field: absent means default, blank means disabled.
    pub fn from_form_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None => AmountSelection::Default,
            Some("") => AmountSelection::Disabled,
            Some(name) => AmountSelection::Column(name.to_string()),
        }
    }
}

/// Columns requested by the caller; `None` / `Default` fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSelection {
    pub manager_column: Option<String>,
    #[serde(default)]
    pub amount_column: AmountSelection,
}

impl ColumnSelection {
    pub fn new(manager_column: Option<String>, amount_column: AmountSelection) -> Self {
        Self {
            manager_column,
            amount_column,
        }
    }
}

/// Columns that exist in the header and will be aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedColumns {
    pub manager_column: String,
    pub amount_column: Option<String>,
}

/// Apply defaults to `selection` and check every chosen column exists.
pub fn resolve(headers: &[String], selection: &ColumnSelection) -> Result<ResolvedColumns, SelectionError> {
    if headers.is_empty() {
        return Err(SelectionError::NoColumns);
    }

    let manager_column = match selection.manager_column.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_manager_column(headers).ok_or(SelectionError::NoColumns)?,
    };
    ensure_present(headers, &manager_column)?;

    let amount_column = match &selection.amount_column {
        AmountSelection::Default => default_amount_column(headers),
        AmountSelection::Column(name) => {
            ensure_present(headers, name)?;
            Some(name.clone())
        }
        AmountSelection::Disabled => None,
    };

    Ok(ResolvedColumns {
        manager_column,
        amount_column,
    })
}

fn ensure_present(headers: &[String], column: &str) -> Result<(), SelectionError> {
    if headers.iter().any(|h| h == column) {
        Ok(())
    } else {
        Err(SelectionError::ColumnNotFound {
            column: column.to_string(),
            available: headers.to_vec(),
        })
    }
}
