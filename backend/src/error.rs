//! Error types for the fund manager participation pipeline.
//!
//! - [`CsvError`] - reading, decoding and parsing the uploaded file
//! - [`SelectionError`] - column selection made by the caller
//! - [`AggregateError`] - the per-manager aggregation itself
//! - [`ExportError`] - serializing the result table to CSV
//! - [`ConfigError`] - server configuration from the environment
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Conversions are provided via `From` so `?` works across layers.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading and parsing the uploaded CSV.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The file has a header (or nothing at all) but no data rows.
    #[error("CSV file has no data rows")]
    EmptyInput,

    /// The header row has no usable column names.
    #[error("No columns found in CSV header")]
    NoColumns,

    /// The content cannot be read as delimited tabular data.
    #[error("Malformed CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },

    /// Delimiter must fit in a single byte.
    #[error("Unsupported delimiter '{0}': must be a single ASCII character")]
    InvalidDelimiter(char),
}

// =============================================================================
// Selection Errors
// =============================================================================

/// Errors while resolving the caller's column choices against the header.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The header is empty, so there is nothing to pick from.
    #[error("No columns available to select from")]
    NoColumns,

    /// A selected column is not in the header.
    #[error("Column '{column}' not found (available: {})", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },
}

// =============================================================================
// Aggregation Errors
// =============================================================================

/// Errors raised by the aggregator.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Column passed to the aggregator does not exist.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Non-numeric amount under the strict amount policy.
    #[error("Row {row}: value '{value}' in column '{column}' is not a number")]
    InvalidAmount {
        row: usize,
        column: String,
        value: String,
    },
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing the result table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer error.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output was not valid UTF-8.
    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("Invalid value '{value}' for {key}: {message}")]
    Invalid {
        key: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::aggregate_bytes`]
/// and friends. It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Column selection error.
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// Aggregation error.
    #[error("Aggregation error: {0}")]
    Aggregate(#[from] AggregateError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl PipelineError {
    /// Whether the error was caused by the uploaded data or the caller's
    /// choices, as opposed to a failure on our side.
    pub fn is_client_error(&self) -> bool {
        match self {
            PipelineError::Csv(CsvError::Io(_)) => false,
            PipelineError::Csv(_) => true,
            PipelineError::Selection(_) => true,
            PipelineError::Aggregate(_) => true,
            PipelineError::Export(_) => false,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload exceeds the configured body limit.
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for aggregation.
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Result type for export.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
