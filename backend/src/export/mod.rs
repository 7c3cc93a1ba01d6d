//! CSV export of the per-manager table.
//!
//! Columns: `Fund manager`, `Participation count` and, when amounts were
//! aggregated, `Total amount raised`.

use std::path::Path;

use crate::error::ExportResult;
use crate::transform::aggregator::AggregationResult;

/// File name offered for the download.
pub const DOWNLOAD_FILE_NAME: &str = "fund_mgr_participation_count.csv";

/// MIME type of the download.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub const COLUMN_FUND_MANAGER: &str = "Fund manager";
pub const COLUMN_PARTICIPATION_COUNT: &str = "Participation count";
pub const COLUMN_TOTAL_AMOUNT: &str = "Total amount raised";

/// Output column names for `result`, in order.
pub fn output_columns(result: &AggregationResult) -> Vec<&'static str> {
    let mut columns = vec![COLUMN_FUND_MANAGER, COLUMN_PARTICIPATION_COUNT];
    if result.has_amount() {
        columns.push(COLUMN_TOTAL_AMOUNT);
    }
    columns
}

/// Format an amount with the shortest representation that round-trips.
pub fn format_amount(amount: f64) -> String {
    amount.to_string()
}

/// Serialize the table to CSV text.
pub fn to_csv(result: &AggregationResult) -> ExportResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(output_columns(result))?;

    for summary in &result.summaries {
        let mut row = vec![
            summary.fund_manager.clone(),
            summary.participation_count.to_string(),
        ];
        if result.has_amount() {
            row.push(format_amount(summary.total_amount_raised.unwrap_or(0.0)));
        }
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(data)?)
}

/// Write the table as CSV to `path`.
pub fn write_csv_file(result: &AggregationResult, path: &Path) -> ExportResult<()> {
    let csv = to_csv(result)?;
    std::fs::write(path, csv)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ManagerSummary;

    fn result(amount_column: Option<&str>, summaries: Vec<ManagerSummary>) -> AggregationResult {
        AggregationResult {
            summaries,
            manager_column: "Investors".into(),
            amount_column: amount_column.map(String::from),
            rows_read: 3,
            rows_without_managers: 0,
            amounts_defaulted: 0,
        }
    }

    fn summary(name: &str, count: usize, total: Option<f64>) -> ManagerSummary {
        ManagerSummary {
            fund_manager: name.into(),
            participation_count: count,
            total_amount_raised: total,
        }
    }

    #[test]
    fn test_csv_with_totals() {
        let r = result(
            Some("Amount"),
            vec![summary("A", 3, Some(17.0)), summary("B", 2, Some(15.5))],
        );
        let csv = to_csv(&r).unwrap();

        assert_eq!(
            csv,
            "Fund manager,Participation count,Total amount raised\nA,3,17\nB,2,15.5\n"
        );
    }

    #[test]
    fn test_csv_without_totals() {
        let r = result(None, vec![summary("A", 3, None)]);
        let csv = to_csv(&r).unwrap();

        assert_eq!(csv, "Fund manager,Participation count\nA,3\n");
        assert_eq!(output_columns(&r).len(), 2);
    }

    #[test]
    fn test_csv_quotes_names_with_commas() {
        let r = result(None, vec![summary("Smith, Jones & Co", 1, None)]);
        let csv = to_csv(&r).unwrap();

        assert!(csv.contains("\"Smith, Jones & Co\",1"));
    }

    #[test]
    fn test_csv_reads_back() {
        let r = result(
            Some("Amount"),
            vec![summary("Alpha, LP", 4, Some(1250000.0))],
        );
        let csv = to_csv(&r).unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "Alpha, LP");
        assert_eq!(&rows[0][1], "4");
        assert_eq!(&rows[0][2], "1250000");
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DOWNLOAD_FILE_NAME);
        let r = result(None, vec![summary("A", 1, None)]);

        write_csv_file(&r, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Fund manager,Participation count\n"));
    }
}
