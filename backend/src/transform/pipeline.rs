//! High-level API: uploaded bytes in, per-manager table out.
//!
//! Combines parsing, column selection and aggregation, logging each step
//! through the log broadcaster.
//!
//! # Example
//!
//! ```rust,ignore
//! use fundcount::{aggregate_file, AggregateOptions};
//! use std::path::Path;
//!
//! let output = aggregate_file(Path::new("deals.csv"), &AggregateOptions::default())?;
//! println!("{} fund managers", output.result.manager_count());
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::aggregator::{aggregate, AggregationResult, AmountPolicy};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::PipelineResult;
use crate::parser::{parse_bytes, parse_csv_file, ParseResult};
use crate::selection::{default_amount_column, default_manager_column, resolve, ColumnSelection};

/// Options for one aggregation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOptions {
    /// Columns to aggregate; unset parts use the defaults
    #[serde(default)]
    pub selection: ColumnSelection,

    /// Handling of non-numeric amounts
    #[serde(default)]
    pub amount_policy: AmountPolicy,

    /// Force a delimiter instead of detecting it
    #[serde(default)]
    pub delimiter: Option<char>,
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.records.len(),
        }
    }
}

/// Result of a complete run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub csv_info: CsvInfo,
    pub result: AggregationResult,
}

/// Header of an upload plus the columns a picker should pre-select
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsInfo {
    pub csv_info: CsvInfo,
    pub default_manager_column: Option<String>,
    pub default_amount_column: Option<String>,
}

/// Aggregate a CSV file.
pub fn aggregate_file(path: &Path, options: &AggregateOptions) -> PipelineResult<PipelineOutput> {
    log_info(format!("📖 Reading {}...", path.display()));
    let parsed = parse_csv_file(path, options.delimiter)?;
    aggregate_parsed(&parsed, options)
}

/// Aggregate uploaded CSV bytes.
pub fn aggregate_bytes(bytes: &[u8], options: &AggregateOptions) -> PipelineResult<PipelineOutput> {
    log_info(format!("📖 Reading upload ({} bytes)...", bytes.len()));
    let parsed = parse_bytes(bytes, options.delimiter)?;
    aggregate_parsed(&parsed, options)
}

/// Aggregate an already-parsed table.
pub fn aggregate_parsed(parsed: &ParseResult, options: &AggregateOptions) -> PipelineResult<PipelineOutput> {
    log_parsed(parsed);

    let columns = resolve(&parsed.headers, &options.selection)?;
    log_info(format!("🗂️  Fund manager column: {}", columns.manager_column));
    match columns.amount_column {
        Some(ref column) => log_info(format!("💷 Amount column: {}", column)),
        None => log_info("💷 No amount column, counting participations only"),
    }

    log_info("📦 Grouping by fund manager...");
    let result = aggregate(
        parsed,
        &columns.manager_column,
        columns.amount_column.as_deref(),
        options.amount_policy,
    )?;
    log_result(&result);

    Ok(PipelineOutput {
        csv_info: CsvInfo::from(parsed),
        result,
    })
}

/// Parse uploaded bytes once and report the header with default picks.
pub fn inspect_bytes(bytes: &[u8], delimiter: Option<char>) -> PipelineResult<ColumnsInfo> {
    let parsed = parse_bytes(bytes, delimiter)?;
    Ok(columns_info(&parsed))
}

/// Parse a file once and report the header with default picks.
pub fn inspect_file(path: &Path, delimiter: Option<char>) -> PipelineResult<ColumnsInfo> {
    let parsed = parse_csv_file(path, delimiter)?;
    Ok(columns_info(&parsed))
}

fn columns_info(parsed: &ParseResult) -> ColumnsInfo {
    ColumnsInfo {
        default_manager_column: default_manager_column(&parsed.headers),
        default_amount_column: default_amount_column(&parsed.headers),
        csv_info: CsvInfo::from(parsed),
    }
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

fn log_parsed(parsed: &ParseResult) {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.records.len()));
    log_info(format!("📋 CSV has {} columns:", parsed.headers.len()));
    for (i, col) in parsed.headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }
}

fn log_result(result: &AggregationResult) {
    log_success(format!("{} fund managers", result.manager_count()));
    log_success(format!("{} participations", result.total_participations()));
    if result.rows_without_managers > 0 {
        log_warning(format!(
            "{} rows have no fund manager and were left out",
            result.rows_without_managers
        ));
    }
    if result.amounts_defaulted > 0 {
        log_warning(format!(
            "{} rows have a missing or non-numeric amount, counted as 0",
            result.amounts_defaulted
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CsvError, PipelineError, SelectionError};
    use crate::selection::{AmountSelection, DEFAULT_AMOUNT_COLUMN, DEFAULT_MANAGER_COLUMN};
    use std::io::Write;

    fn deals_csv() -> String {
        format!(
            "Deal,{},{}\nD1,\"A, B\",10\nD2,\"B, A\",5\nD3,A,2\n",
            DEFAULT_MANAGER_COLUMN, DEFAULT_AMOUNT_COLUMN
        )
    }

    #[test]
    fn test_default_options() {
        let opts = AggregateOptions::default();
        assert_eq!(opts.amount_policy, AmountPolicy::Lenient);
        assert_eq!(opts.selection.amount_column, AmountSelection::Default);
        assert!(opts.delimiter.is_none());
    }

    #[test]
    fn test_aggregate_bytes_with_defaults() {
        let output = aggregate_bytes(deals_csv().as_bytes(), &AggregateOptions::default()).unwrap();

        assert_eq!(output.csv_info.row_count, 3);
        assert_eq!(output.csv_info.delimiter, ',');
        assert_eq!(output.result.manager_column, DEFAULT_MANAGER_COLUMN);
        assert_eq!(output.result.get("A").unwrap().total_amount_raised, Some(17.0));
        assert_eq!(output.result.get("B").unwrap().participation_count, 2);
    }

    #[test]
    fn test_aggregate_without_amounts() {
        let options = AggregateOptions {
            selection: ColumnSelection::new(None, AmountSelection::Disabled),
            ..Default::default()
        };
        let output = aggregate_bytes(deals_csv().as_bytes(), &options).unwrap();
        assert!(!output.result.has_amount());
    }

    #[test]
    fn test_unknown_column_fails_before_aggregation() {
        let options = AggregateOptions {
            selection: ColumnSelection::new(Some("Managers".into()), AmountSelection::Default),
            ..Default::default()
        };
        let err = aggregate_bytes(deals_csv().as_bytes(), &options).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Selection(SelectionError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_header_only_upload() {
        let csv = format!("{}\n", DEFAULT_MANAGER_COLUMN);
        let err = aggregate_bytes(csv.as_bytes(), &AggregateOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(CsvError::EmptyInput)));
    }

    #[test]
    fn test_unclosed_quote_upload_fails() {
        let csv = format!(
            "{},{}\n\"A, B,10\nC,5\nD,7\n",
            DEFAULT_MANAGER_COLUMN, DEFAULT_AMOUNT_COLUMN
        );
        let err = aggregate_bytes(csv.as_bytes(), &AggregateOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(CsvError::Malformed { line: 2, .. })));
    }

    #[test]
    fn test_semicolons_in_header_name_keep_comma() {
        let csv = format!(
            "Deal (seed; series A; series B; C),{},{}\nD1,\"A, B\",10\n",
            DEFAULT_MANAGER_COLUMN, DEFAULT_AMOUNT_COLUMN
        );
        let output = aggregate_bytes(csv.as_bytes(), &AggregateOptions::default()).unwrap();

        assert_eq!(output.csv_info.delimiter, ',');
        assert_eq!(output.result.manager_column, DEFAULT_MANAGER_COLUMN);
        assert_eq!(output.result.get("A").unwrap().total_amount_raised, Some(10.0));
        assert_eq!(output.result.get("B").unwrap().participation_count, 1);
    }

    #[test]
    fn test_inspect_reports_defaults() {
        let info = inspect_bytes(deals_csv().as_bytes(), None).unwrap();

        assert_eq!(info.csv_info.headers.len(), 3);
        assert_eq!(info.default_manager_column.as_deref(), Some(DEFAULT_MANAGER_COLUMN));
        assert_eq!(info.default_amount_column.as_deref(), Some(DEFAULT_AMOUNT_COLUMN));
    }

    #[test]
    fn test_inspect_falls_back_to_first_column() {
        let info = inspect_bytes(b"Investors,Raised\nA,1\n", None).unwrap();

        assert_eq!(info.default_manager_column.as_deref(), Some("Investors"));
        assert_eq!(info.default_amount_column, None);
    }

    #[test]
    fn test_aggregate_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(deals_csv().as_bytes()).unwrap();

        let output = aggregate_file(file.path(), &AggregateOptions::default()).unwrap();
        assert_eq!(output.result.manager_count(), 2);

        let info = inspect_file(file.path(), None).unwrap();
        assert_eq!(info.csv_info.row_count, 3);
    }

    #[test]
    fn test_forced_delimiter() {
        let csv = "Investors;Raised\n\"A, B\";3\n";
        let options = AggregateOptions {
            selection: ColumnSelection::new(
                Some("Investors".into()),
                AmountSelection::Column("Raised".into()),
            ),
            delimiter: Some(';'),
            ..Default::default()
        };
        let output = aggregate_bytes(csv.as_bytes(), &options).unwrap();
        assert_eq!(output.result.get("B").unwrap().total_amount_raised, Some(3.0));
    }
}
