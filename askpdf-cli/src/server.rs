//! HTTP front end
//!
//! | Route                | Purpose                                         |
//! |----------------------|-------------------------------------------------|
//! | `POST /api/ask`      | `{question}` -> `{think, answer}`               |
//! | `POST /api/upload`   | multipart field `pdf`, stored then re-ingested  |
//! | `GET /api/documents` | `?page=&limit=` listing of indexed chunks       |
//! | `GET /api/status`    | corpus lifecycle state and snapshot stats       |

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use askpdf_lib::document::PdfLoader;
use askpdf_lib::RagService;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const DEFAULT_PAGE: usize = 1;
const DEFAULT_LIMIT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    service: Arc<RagService>,
}

impl AppState {
    pub fn new(service: Arc<RagService>) -> Self {
        Self { service }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Build the first snapshot in the background right after binding
    pub ingest_on_startup: bool,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ask", post(ask))
        .route("/api/upload", post(upload))
        .route("/api/documents", get(documents))
        .route("/api/status", get(status))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, service: Arc<RagService>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid host/port {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("askpdf listening on http://{addr}");

    if config.ingest_on_startup {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            // a failure here is retried lazily by the first question
            if let Err(e) = service.reindex().await {
                error!(error = %e, "startup ingestion failed");
            }
        });
    }

    axum::serve(listener, app_router(AppState::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

async fn ask(State(state): State<AppState>, request: Result<Json<AskRequest>, JsonRejection>) -> Response {
    let question = match request {
        Ok(Json(AskRequest { question: Some(q) })) if !q.trim().is_empty() => q,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, "Question is required"),
        Err(rejection) => {
            warn!(error = %rejection, "rejected ask request");
            return error_response(StatusCode::BAD_REQUEST, "Question is required");
        }
    };

    match state.service.ask(&question).await {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => {
            error!(error = %e, "failed to answer question");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process question")
        }
    }
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut pdf = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("pdf") => {
                if field.content_type() != Some("application/pdf") {
                    return error_response(StatusCode::BAD_REQUEST, "Only PDF files are allowed");
                }
                match field.bytes().await {
                    Ok(bytes) => pdf = Some(bytes),
                    Err(e) => {
                        warn!(error = %e, "failed to read upload");
                        return error_response(StatusCode::BAD_REQUEST, "Failed to read uploaded file");
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart body");
                return error_response(StatusCode::BAD_REQUEST, "Malformed upload");
            }
        }
    }
    let Some(pdf) = pdf else {
        return error_response(StatusCode::BAD_REQUEST, "No PDF file uploaded");
    };

    let filename = format!("{}.pdf", Utc::now().timestamp_millis());

    // an unreadable upload never reaches the documents directory
    let parse = {
        let (pdf, filename) = (pdf.clone(), filename.clone());
        tokio::task::spawn_blocking(move || PdfLoader.load_bytes(&pdf, &filename)).await
    };
    match parse {
        Ok(Ok(pages)) => info!(%filename, pages = pages.len(), "upload parsed"),
        Ok(Err(e)) => {
            warn!(%filename, error = %e, "rejected unreadable upload");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process PDF");
        }
        Err(e) => {
            error!(error = %e, "upload parse task panicked");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process PDF");
        }
    }

    let path = state.service.documents_path().join(&filename);
    if let Err(e) = store_upload(&path, &pdf).await {
        error!(path = %path.display(), error = %e, "failed to store upload");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process PDF");
    }
    info!(%filename, bytes = pdf.len(), "stored upload, re-ingesting");

    // ingestion runs to completion even if the client goes away
    let service = Arc::clone(&state.service);
    let result = tokio::spawn(async move { service.reindex().await }).await;

    match result {
        Ok(Ok(snapshot)) => Json(json!({
            "message": "PDF uploaded and processed successfully",
            "filename": filename,
            "documentsProcessed": snapshot.len(),
        }))
        .into_response(),
        Ok(Err(e)) => {
            // the stored file stays and is picked up by the next ingestion
            error!(%filename, error = %e, "ingestion after upload failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process PDF")
        }
        Err(e) => {
            error!(error = %e, "ingestion task panicked");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process PDF")
        }
    }
}

async fn store_upload(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, bytes).await
}

#[derive(Debug, Deserialize)]
struct DocumentsQuery {
    page: Option<usize>,
    limit: Option<usize>,
}

async fn documents(State(state): State<AppState>, Query(query): Query<DocumentsQuery>) -> Response {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    match state.service.documents(page, limit).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn status(State(state): State<AppState>) -> Response {
    Json(state.service.status().await).into_response()
}
