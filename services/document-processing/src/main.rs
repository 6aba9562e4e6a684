//! Statement Reconciliation Service
//!
//! Accepts a reference sheet plus a batch of statement PDFs and returns the
//! per-unit archive.

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use integra_document_processing::{LopdfBackend, ReconciliationService, RunOutcome, RunRequest, SourceFile};
use integra_models::{DocumentKind, RunConfig, UnknownKind};
use integra_utils::{
    init_logging, validate_file_size, validate_file_type, AppConfig, ErrorResponse, StatementError,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    service: ReconciliationService<LopdfBackend>,
    max_file_size: u64,
}

const SHEET_TYPES: &[&str] = &["xlsx", "xls", "csv"];

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|_| {
        eprintln!("Failed to load configuration, using defaults");
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting Statement Reconciliation Service");

    let state = AppState {
        service: ReconciliationService::new(LopdfBackend::new(), config.processing.clone()),
        max_file_size: config.server.max_file_size,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/runs", post(create_run))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.server.max_request_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Statement Reconciliation Service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "document-processing",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(error: StatementError) -> ApiError {
    let status = StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(error)))
}

fn multipart_error(error: impl std::fmt::Display) -> StatementError {
    StatementError::validation("multipart", format!("Upload error: {}", error))
}

/// Collect `reference`, `documents` and `options` from the upload.
///
/// A bare `kind` field (`bank`, `esic` or `pf`) stands in for `options` when
/// the defaults of that kind are wanted.
async fn read_request(mut multipart: Multipart, max_file_size: u64) -> Result<RunRequest, StatementError> {
    let mut reference = None;
    let mut documents = Vec::new();
    let mut config: Option<RunConfig> = None;
    let mut kind: Option<DocumentKind> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        validate_file_size(data.len() as u64, max_file_size)?;

        match name.as_str() {
            "reference" => {
                let file_name = file_name.unwrap_or_else(|| "reference.xlsx".to_string());
                validate_file_type(&file_name, SHEET_TYPES)?;
                reference = Some((file_name, data.to_vec()));
            }
            "documents" => {
                let file_name = file_name.unwrap_or_else(|| format!("statement-{}.pdf", documents.len() + 1));
                validate_file_type(&file_name, &["pdf"])?;
                documents.push(SourceFile::new(file_name, data.to_vec()));
            }
            "options" => config = Some(serde_json::from_slice(&data)?),
            "kind" => {
                let text = String::from_utf8_lossy(&data);
                let parsed = text
                    .parse::<DocumentKind>()
                    .map_err(|e: UnknownKind| StatementError::validation("kind", e.to_string()))?;
                kind = Some(parsed);
            }
            other => warn!(field = other, "Ignoring unknown upload field"),
        }
    }

    let (reference_name, reference) =
        reference.ok_or_else(|| StatementError::validation("reference", "A reference sheet is required"))?;
    let config = config
        .or_else(|| kind.map(RunConfig::new))
        .ok_or_else(|| StatementError::validation("options", "Run options or a kind are required"))?;
    if documents.is_empty() {
        return Err(StatementError::validation("documents", "At least one statement is required"));
    }

    Ok(RunRequest {
        reference_name,
        reference,
        documents,
        config,
    })
}

/// Run a reconciliation and stream back the master archive
async fn create_run(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ApiError> {
    let run_id = Uuid::new_v4();
    let request = read_request(multipart, state.max_file_size).await.map_err(api_error)?;

    info!(
        %run_id,
        reference = %request.reference_name,
        documents = request.documents.len(),
        kind = %request.config.kind,
        "Run requested"
    );

    let outcome = state
        .service
        .run(request, None)
        .instrument(tracing::info_span!("run", %run_id))
        .await
        .map_err(|e| {
            warn!(%run_id, error = %e, "Run failed");
            api_error(e)
        })?;

    match outcome {
        RunOutcome::Completed { archive, stats } => {
            let headers = [
                (header::CONTENT_TYPE, "application/zip".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", archive.file_name),
                ),
                (HeaderName::from_static("x-run-id"), run_id.to_string()),
                (HeaderName::from_static("x-highlight-count"), stats.highlight_count.to_string()),
                (HeaderName::from_static("x-mask-count"), stats.mask_count.to_string()),
                (HeaderName::from_static("x-skipped-files"), stats.skipped.len().to_string()),
            ];
            Ok((StatusCode::OK, headers, archive.bytes).into_response())
        }
        RunOutcome::NoMatches { stats } => Ok(Json(serde_json::json!({
            "status": "no_matches",
            "run_id": run_id,
            "stats": stats
        }))
        .into_response()),
    }
}
