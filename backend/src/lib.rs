//! # Fundcount - fund manager participation counter
//!
//! Takes a CSV of investment deals, splits the fund manager list of each
//! deal on `", "`, and counts in how many deals each manager takes part.
//! When an amount column is selected, the amount of every deal is also
//! summed per manager.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Aggregate  │────▶│  CSV / JSON │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (by manager)│     │   (table)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fundcount::{aggregate_bytes, to_csv, AggregateOptions};
//!
//! let output = aggregate_bytes(&bytes, &AggregateOptions::default())?;
//! println!("{}", to_csv(&output.result)?);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Deal rows and manager summaries
//! - [`parser`] - CSV parsing with auto-detection
//! - [`selection`] - Default column picks and column validation
//! - [`transform`] - Aggregation and pipeline
//! - [`export`] - CSV output
//! - [`config`] - Server configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Column selection
pub mod selection;

// Transformation
pub mod transform;

// Output
pub mod export;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AggregateError,
    ConfigError,
    CsvError,
    ExportError,
    PipelineError,
    SelectionError,
    ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{split_managers, AmountCell, DealRecord, ManagerSummary, MANAGER_SEPARATOR};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes,
    parse_bytes_auto,
    parse_csv_file,
    parse_csv_file_auto,
    parse_str,
    ParseResult,
};

// =============================================================================
// Re-exports - Selection
// =============================================================================

pub use selection::{
    default_amount_column,
    default_manager_column,
    resolve,
    AmountSelection,
    ColumnSelection,
    ResolvedColumns,
    DEFAULT_AMOUNT_COLUMN,
    DEFAULT_MANAGER_COLUMN,
};

// =============================================================================
// Re-exports - Aggregation & Pipeline
// =============================================================================

pub use transform::aggregator::{aggregate, AggregationResult, AmountPolicy};

pub use transform::pipeline::{
    aggregate_bytes,
    aggregate_file,
    aggregate_parsed,
    inspect_bytes,
    inspect_file,
    AggregateOptions,
    ColumnsInfo,
    CsvInfo,
    PipelineOutput,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{to_csv, write_csv_file, DOWNLOAD_FILE_NAME};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{AggregateResponse, ColumnsResponse, error_response};

pub use config::ServerConfig;

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
