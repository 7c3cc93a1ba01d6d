//! REST API types for the upload shell.
//!
//! Bodies are camelCase JSON. The aggregation response carries the table
//! rows plus what a UI needs to label and download them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::export::{output_columns, DOWNLOAD_FILE_NAME};
use crate::models::ManagerSummary;
use crate::transform::aggregator::AmountPolicy;
use crate::transform::pipeline::{format_delimiter, ColumnsInfo, CsvInfo, PipelineOutput};

/// Response to `POST /api/aggregate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" or "warning" (some rows or amounts were left out)
    pub status: String,

    /// Output column labels, in order
    pub columns: Vec<String>,

    /// One row per fund manager, sorted by name
    pub rows: Vec<ManagerSummary>,

    pub metadata: AggregateMetadata,
}

/// Metadata about an aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetadata {
    pub manager_column: String,
    pub amount_column: Option<String>,
    pub amount_policy: AmountPolicy,
    pub manager_count: usize,
    pub rows_without_managers: usize,
    pub amounts_defaulted: usize,
    pub download_file_name: String,
    pub generated_at: String,
    pub csv_info: CsvMetadata,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<CsvInfo> for CsvMetadata {
    fn from(info: CsvInfo) -> Self {
        CsvMetadata {
            encoding: info.encoding,
            delimiter: format_delimiter(info.delimiter),
            row_count: info.row_count,
            columns: info.headers,
        }
    }
}

impl AggregateResponse {
    pub fn new(output: PipelineOutput, amount_policy: AmountPolicy) -> Self {
        let result = output.result;
        let columns = output_columns(&result)
            .into_iter()
            .map(String::from)
            .collect();
        let clean = result.rows_without_managers == 0 && result.amounts_defaulted == 0;

        AggregateResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if clean { "ready" } else { "warning" }.to_string(),
            columns,
            metadata: AggregateMetadata {
                manager_count: result.manager_count(),
                manager_column: result.manager_column,
                amount_column: result.amount_column,
                amount_policy,
                rows_without_managers: result.rows_without_managers,
                amounts_defaulted: result.amounts_defaulted,
                download_file_name: DOWNLOAD_FILE_NAME.to_string(),
                generated_at: chrono::Utc::now().to_rfc3339(),
                csv_info: output.csv_info.into(),
            },
            rows: result.summaries,
        }
    }
}

/// Response to `POST /api/columns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub job_id: String,
    pub status: String,
    /// Column names to offer in the pickers
    pub columns: Vec<String>,
    /// Pre-selected manager column
    pub default_manager_column: Option<String>,
    /// Pre-selected amount column
    pub default_amount_column: Option<String>,
    pub csv_info: CsvMetadata,
}

impl From<ColumnsInfo> for ColumnsResponse {
    fn from(info: ColumnsInfo) -> Self {
        ColumnsResponse {
            job_id: Uuid::new_v4().to_string(),
            status: "ready".to_string(),
            columns: info.csv_info.headers.clone(),
            default_manager_column: info.default_manager_column,
            default_amount_column: info.default_amount_column,
            csv_info: info.csv_info.into(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "rows": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::aggregator::AggregationResult;

    fn output(amount_column: Option<&str>, rows_without_managers: usize) -> PipelineOutput {
        PipelineOutput {
            csv_info: CsvInfo {
                encoding: "utf-8".into(),
                delimiter: '\t',
                headers: vec!["Investors".into(), "Raised".into()],
                row_count: 2,
            },
            result: AggregationResult {
                summaries: vec![ManagerSummary {
                    fund_manager: "A".into(),
                    participation_count: 2,
                    total_amount_raised: amount_column.map(|_| 12.0),
                }],
                manager_column: "Investors".into(),
                amount_column: amount_column.map(String::from),
                rows_read: 2,
                rows_without_managers,
                amounts_defaulted: 0,
            },
        }
    }

    #[test]
    fn test_aggregate_response_shape() {
        let response = AggregateResponse::new(output(Some("Raised"), 0), AmountPolicy::Lenient);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "ready");
        assert_eq!(
            json["columns"],
            json!(["Fund manager", "Participation count", "Total amount raised"])
        );
        assert_eq!(json["rows"][0]["fundManager"], "A");
        assert_eq!(json["rows"][0]["totalAmountRaised"], 12.0);
        assert_eq!(json["metadata"]["amountPolicy"], "lenient");
        assert_eq!(json["metadata"]["downloadFileName"], DOWNLOAD_FILE_NAME);
        assert_eq!(json["metadata"]["csvInfo"]["delimiter"], "TAB");
    }

    #[test]
    fn test_warning_status_when_rows_left_out() {
        let response = AggregateResponse::new(output(None, 1), AmountPolicy::Strict);
        assert_eq!(response.status, "warning");
        assert_eq!(response.columns.len(), 2);
    }

    #[test]
    fn test_columns_response() {
        let info = ColumnsInfo {
            csv_info: output(None, 0).csv_info,
            default_manager_column: Some("Investors".into()),
            default_amount_column: None,
        };
        let response = ColumnsResponse::from(info);

        assert_eq!(response.columns, vec!["Investors", "Raised"]);
        assert_eq!(response.default_manager_column.as_deref(), Some("Investors"));
        assert!(response.default_amount_column.is_none());
    }

    #[test]
    fn test_error_response() {
        let body = error_response("CSV file has no data rows");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "CSV file has no data rows");
        assert!(body["rows"].as_array().unwrap().is_empty());
    }
}
