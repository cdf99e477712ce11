//! HTTP preview server.
//!
//! Serves effective CSS for documents, accepts drafts from an editing
//! session, and pushes re-resolved CSS to connected pages over
//! server-sent events so they can swap a single `<style>` element.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/documents/{id}/css` | Effective CSS (`text/css`) |
//! | `GET`  | `/documents/{id}/source` | Source shown in the editor |
//! | `POST` | `/documents/{id}/preview` | Resolve a draft without saving |
//! | `POST` | `/documents/{id}/commit` | Compile and save a draft |
//! | `GET`  | `/documents/{id}/revisions` | Saved revisions, oldest first |
//! | `GET`  | `/documents/{id}/events` | SSE stream of rendered CSS |
//!
//! Draft bodies are JSON objects with optional `mode` and `raw_source`:
//!
//! ```json
//! { "mode": "scss", "raw_source": ".nav { a { color: red; } }" }
//! ```
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "compile_error", "message": "expected \"}\"." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `compile_error` (422),
//! `store_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so an editor served from
//! another origin can post drafts.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use custom_scss_core::error::{CommitError, CompileError, StoreError};
use custom_scss_core::models::{DraftOverlay, Mode};
use custom_scss_core::preview::{ChangeNotification, Delivery, PreviewBridge, RenderSurface};
use custom_scss_core::resolve::{ResolutionState, Resolver};

use crate::app::App;
use crate::config::Config;
use crate::get::RevisionResponse;

const EVENT_CAPACITY: usize = 64;

/// CSS delivered to a render surface for one document.
#[derive(Debug, Clone)]
pub struct RenderedCss {
    pub document_id: String,
    pub css: String,
}

/// Render surface that fans rendered CSS out to every SSE subscriber.
pub struct BroadcastSurface {
    tx: broadcast::Sender<RenderedCss>,
}

impl BroadcastSurface {
    pub fn new(tx: broadcast::Sender<RenderedCss>) -> Self {
        Self { tx }
    }
}

impl RenderSurface for BroadcastSurface {
    fn render(&self, document_id: &str, css: &str) {
        // No subscribers is not an error.
        let _ = self.tx.send(RenderedCss {
            document_id: document_id.to_string(),
            css: css.to_string(),
        });
    }
}

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    resolver: Arc<Resolver>,
    bridge: Arc<PreviewBridge>,
    events: broadcast::Sender<RenderedCss>,
}

/// Starts the preview server on `[server].bind`.
///
/// Opens the database, applies migrations, and serves until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = App::open(config).await?;
    run_server_with_resolver(&config.server.bind, app.resolver).await
}

/// Starts the preview server with an already-built [`Resolver`].
///
/// Used by embedders that supply their own store, mode settings or
/// compiler.
pub async fn run_server_with_resolver(bind_addr: &str, resolver: Arc<Resolver>) -> anyhow::Result<()> {
    let app = router(resolver);

    tracing::info!(bind = %bind_addr, "preview server listening");
    println!("Preview server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with its own event channel and preview bridge.
pub fn router(resolver: Arc<Resolver>) -> Router {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    let surface = Arc::new(BroadcastSurface::new(events.clone()));
    let bridge = Arc::new(PreviewBridge::new(resolver.clone(), surface));

    let state = AppState {
        resolver,
        bridge,
        events,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents/{id}/css", get(handle_css))
        .route("/documents/{id}/source", get(handle_source))
        .route("/documents/{id}/preview", post(handle_preview))
        .route("/documents/{id}/commit", post(handle_commit))
        .route("/documents/{id}/revisions", get(handle_revisions))
        .route("/documents/{id}/events", get(handle_events))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn compile_error(err: &CompileError) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        code: "compile_error".to_string(),
        message: err.to_string(),
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store failure");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "store_error".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<CommitError> for AppError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Compile(e) => compile_error(&e),
            CommitError::Store(e) => e.into(),
        }
    }
}

/// Malformed or mistyped request bodies answer 400 with the same error
/// shape as every other failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn check_document_id(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(bad_request("document id must not be empty"));
    }
    Ok(())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /documents/{id}/css ============

/// Load path. Never compiles.
async fn handle_css(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    check_document_id(&id)?;
    let css = state.resolver.load(&id).await?;
    Ok(([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response())
}

// ============ GET /documents/{id}/source ============

async fn handle_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    check_document_id(&id)?;
    let source = state.resolver.editor_value(&id, None).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], source).into_response())
}

// ============ POST /documents/{id}/preview ============

#[derive(Serialize)]
struct FallbackResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
}

impl From<CompileError> for FallbackResponse {
    fn from(err: CompileError) -> Self {
        FallbackResponse {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

#[derive(Serialize)]
struct PreviewResponse {
    superseded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    css: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<ResolutionState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<FallbackResponse>,
    rejected: Vec<String>,
}

/// Live-preview path. A draft that fails to compile still answers 200 with
/// the last saved CSS and the diagnostic under `fallback`.
async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    overlay: Result<Json<DraftOverlay>, JsonRejection>,
) -> Result<Json<PreviewResponse>, AppError> {
    check_document_id(&id)?;
    let Json(overlay) = overlay?;

    let delivery = state
        .bridge
        .notify(ChangeNotification {
            document_id: id,
            overlay,
        })
        .await?;

    let response = match delivery {
        Delivery::Rendered(outcome) => PreviewResponse {
            superseded: false,
            css: Some(outcome.css),
            mode: Some(outcome.mode),
            state: Some(outcome.state),
            fallback: outcome.fallback.map(FallbackResponse::from),
            rejected: outcome.rejected.iter().map(|e| e.to_string()).collect(),
        },
        Delivery::Superseded => PreviewResponse {
            superseded: true,
            css: None,
            mode: None,
            state: None,
            fallback: None,
            rejected: Vec::new(),
        },
    };

    Ok(Json(response))
}

// ============ POST /documents/{id}/commit ============

#[derive(Serialize)]
struct CommitResponse {
    id: String,
    mode: Mode,
    state: ResolutionState,
    mode_persisted: bool,
    rejected: Vec<String>,
}

/// Commit path. Compile failures answer 422 and nothing is saved.
async fn handle_commit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    overlay: Result<Json<DraftOverlay>, JsonRejection>,
) -> Result<Json<CommitResponse>, AppError> {
    check_document_id(&id)?;
    let Json(overlay) = overlay?;

    let outcome = state.resolver.commit(&id, &overlay).await?;

    let _ = state.events.send(RenderedCss {
        document_id: id.clone(),
        css: outcome.compiled_output.clone(),
    });

    Ok(Json(CommitResponse {
        id: outcome.id,
        mode: outcome.mode,
        state: outcome.state,
        mode_persisted: outcome.mode_persisted,
        rejected: outcome.rejected.iter().map(|e| e.to_string()).collect(),
    }))
}

// ============ GET /documents/{id}/revisions ============

#[derive(Serialize)]
struct RevisionListResponse {
    document_id: String,
    revisions: Vec<RevisionResponse>,
}

async fn handle_revisions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RevisionListResponse>, AppError> {
    check_document_id(&id)?;

    let revisions = state.resolver.store().revisions(&id).await?;
    if revisions.is_empty() {
        return Err(not_found(format!("no revisions for document: {}", id)));
    }

    Ok(Json(RevisionListResponse {
        document_id: id,
        revisions: revisions.into_iter().map(RevisionResponse::from).collect(),
    }))
}

// ============ GET /documents/{id}/events ============

/// SSE stream of `css` events for one document.
///
/// Subscribers that fall behind skip the missed renders; only the latest
/// CSS matters to a page.
async fn handle_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    check_document_id(&id)?;

    let rx = state.events.subscribe();
    tracing::debug!(document_id = %id, "event subscriber connected");

    Ok(Sse::new(rendered_css_stream(rx, id)).keep_alive(KeepAlive::default()))
}

fn rendered_css_stream(
    rx: broadcast::Receiver<RenderedCss>,
    document_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((rx, document_id), |(mut rx, document_id)| async move {
        loop {
            match rx.recv().await {
                Ok(rendered) if rendered.document_id == document_id => {
                    let event = Event::default().event("css").data(rendered.css);
                    return Some((Ok(event), (rx, document_id)));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}
