//! HTTP server for the participation counter.
//!
//! This is the upload shell: it parses the header once for the column
//! pickers, runs the aggregation and serves the CSV download.
//!
//! # API Endpoints
//!
//! | Method | Path             | Description                                |
//! |--------|------------------|--------------------------------------------|
//! | GET    | `/health`        | Health check                               |
//! | POST   | `/api/columns`   | Header and default column picks of a CSV   |
//! | POST   | `/api/aggregate` | Per-manager table as JSON                  |
//! | POST   | `/api/download`  | Per-manager table as a CSV attachment      |
//! | GET    | `/api/logs`      | SSE stream for real-time logs              |
//!
//! Upload endpoints take `multipart/form-data` with a `file` field and the
//! optional text fields `managerColumn`, `amountColumn` (blank disables
//! amounts), `strictAmounts` (`true`/`false`) and `delimiter`.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, AggregateResponse, ColumnsResponse};
use crate::config::ServerConfig;
use crate::error::{PipelineResult, ServerError, ServerResult};
use crate::export::{to_csv, CSV_CONTENT_TYPE, DOWNLOAD_FILE_NAME};
use crate::selection::{AmountSelection, ColumnSelection};
use crate::transform::aggregator::AmountPolicy;
use crate::transform::pipeline::{aggregate_bytes, inspect_bytes, AggregateOptions, PipelineOutput};

type ApiError = (StatusCode, Json<Value>);

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(&config);
    let addr = config.socket_addr();

    println!("🚀 Fundcount server running on http://{}", addr);
    println!("   POST /api/columns   - Inspect CSV header");
    println!("   POST /api/aggregate - Count fund manager participation");
    println!("   POST /api/download  - Download {}", DOWNLOAD_FILE_NAME);
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router.
pub fn router(config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/columns", post(upload_columns))
        .route("/api/aggregate", post(upload_aggregate))
        .route("/api/download", post(upload_download))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fundcount",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "columns": "POST /api/columns",
            "aggregate": "POST /api/aggregate",
            "download": "POST /api/download",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Header inspection endpoint
async fn upload_columns(multipart: Multipart) -> Result<Json<ColumnsResponse>, ApiError> {
    let form = UploadForm::read(multipart).await.map_err(into_api_error)?;
    log_info(format!("📄 Inspecting {}", form.display_name()));

    let delimiter = form.delimiter;
    let bytes = form.bytes;
    let info = run_blocking(move || inspect_bytes(&bytes, delimiter))
        .await
        .map_err(into_api_error)?;

    Ok(Json(ColumnsResponse::from(info)))
}

/// Aggregation endpoint
async fn upload_aggregate(multipart: Multipart) -> Result<Json<AggregateResponse>, ApiError> {
    let form = UploadForm::read(multipart).await.map_err(into_api_error)?;
    let policy = form.amount_policy;
    let output = aggregate_form(form).await.map_err(into_api_error)?;

    Ok(Json(AggregateResponse::new(output, policy)))
}

/// CSV download endpoint
async fn upload_download(multipart: Multipart) -> Result<impl IntoResponse, ApiError> {
    let form = UploadForm::read(multipart).await.map_err(into_api_error)?;
    let output = aggregate_form(form).await.map_err(into_api_error)?;
    let csv = to_csv(&output.result)
        .map_err(|e| into_api_error(ServerError::Pipeline(e.into())))?;

    let disposition = format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME);
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

async fn aggregate_form(form: UploadForm) -> ServerResult<PipelineOutput> {
    println!("\n{}", "=".repeat(70));
    println!("📄 NEW UPLOAD: {} ({} bytes)", form.display_name(), form.bytes.len());
    println!("{}\n", "=".repeat(70));

    let options = form.options();
    let bytes = form.bytes;
    run_blocking(move || aggregate_bytes(&bytes, &options)).await
}

/// Run a pipeline step on the blocking pool.
async fn run_blocking<T, F>(job: F) -> ServerResult<T>
where
    F: FnOnce() -> PipelineResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ServerError::Internal(format!("Aggregation task failed: {}", e)))?;

    result.map_err(|e| {
        log_error(e.to_string());
        ServerError::Pipeline(e)
    })
}

/// HTTP status for a server error.
pub fn status_for(err: &ServerError) -> StatusCode {
    match err {
        ServerError::Pipeline(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn into_api_error(err: ServerError) -> ApiError {
    let message = match &err {
        // Strip "Pipeline error:" but keep the stage prefix ("CSV error: ...").
        ServerError::Pipeline(e) => e.to_string(),
        other => other.to_string(),
    };
    (status_for(&err), Json(error_response(&message)))
}

fn multipart_error(err: MultipartError) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(err.body_text())
    } else {
        ServerError::BadRequest(format!("Multipart error: {}", err.body_text()))
    }
}

/// Fields of an upload request.
#[derive(Debug, Default)]
struct UploadForm {
    file_name: Option<String>,
    bytes: Vec<u8>,
    manager_column: Option<String>,
    amount_column: Option<String>,
    amount_policy: AmountPolicy,
    delimiter: Option<char>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> ServerResult<Self> {
        let mut form = UploadForm::default();
        let mut has_file = false;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "file" => {
                    form.file_name = field.file_name().map(|s| s.to_string());
                    form.bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
                    has_file = true;
                }
                "managerColumn" => {
                    form.manager_column = Some(field.text().await.map_err(multipart_error)?);
                }
                "amountColumn" => {
                    form.amount_column = Some(field.text().await.map_err(multipart_error)?);
                }
                "strictAmounts" => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.amount_policy = parse_policy(&value)?;
                }
                "delimiter" => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.delimiter = parse_delimiter(&value)?;
                }
                _ => {}
            }
        }

        if !has_file {
            return Err(ServerError::BadRequest("No file provided".to_string()));
        }

        Ok(form)
    }

    fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("unknown")
    }

    fn options(&self) -> AggregateOptions {
        AggregateOptions {
            selection: ColumnSelection::new(
                self.manager_column.clone(),
                AmountSelection::from_form_value(self.amount_column.as_deref()),
            ),
            amount_policy: self.amount_policy,
            delimiter: self.delimiter,
        }
    }
}

fn parse_policy(value: &str) -> ServerResult<AmountPolicy> {
    match value.trim().to_lowercase().as_str() {
        "" | "false" | "0" | "no" | "off" => Ok(AmountPolicy::Lenient),
        "true" | "1" | "yes" | "on" => Ok(AmountPolicy::Strict),
        other => Err(ServerError::BadRequest(format!(
            "strictAmounts must be true or false, got '{}'",
            other
        ))),
    }
}

fn parse_delimiter(value: &str) -> ServerResult<Option<char>> {
    if value.is_empty() {
        return Ok(None);
    }
    if value == "\\t" {
        return Ok(Some('\t'));
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Some(c)),
        _ => Err(ServerError::BadRequest(format!(
            "delimiter must be a single character, got '{}'",
            value
        ))),
    }
}
