//! HTTP boundary over the [`Library`] facade.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/roots` | Resolved archive roots |
//! | `GET`  | `/api/scan` | Catalog summary |
//! | `GET`  | `/api/chat?char=&file=` | One sanitized transcript |
//! | `GET`  | `/api/images?char=` | Gallery, optionally filtered |
//! | `GET`  | `/api/characters/{name}/images` | Images owned by a character |
//! | `GET`  | `/api/image?path=` | Image bytes, restricted to the roots |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "character not found: Alice" } }
//! ```
//!
//! Error codes: `missing_parameter` (400), `forbidden` (403), `not_found` (404),
//! `internal` (500).
//!
//! The router holds only the library (resolved roots plus scan options);
//! every request re-scans the archive on a blocking thread.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::LibraryError;
use crate::library::{ChatView, ImageView, Library, ScanSummary};

#[derive(Clone)]
struct AppState {
    library: Arc<Library>,
}

/// Starts the server on `[server].bind` and runs until the process ends.
pub async fn run_server(config: &Config, library: Library) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(library));

    info!("chat library listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router with permissive CORS.
pub fn router(library: Arc<Library>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/roots", get(handle_roots))
        .route("/api/scan", get(handle_scan))
        .route("/api/chat", get(handle_chat))
        .route("/api/images", get(handle_images))
        .route("/api/characters/{name}/images", get(handle_character_images))
        .route("/api/image", get(handle_image))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { library })
}

/// Renders a file path as the locator clients use to fetch it.
pub fn image_locator(path: &FsPath) -> String {
    let raw = path.to_string_lossy();
    let encoded: String = url::form_urlencoded::byte_serialize(raw.as_bytes()).collect();
    format!("/api/image?path={}", encoded)
}

fn content_type(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
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

#[derive(Debug)]
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

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        let status = match &err {
            LibraryError::MissingParameter { .. } => StatusCode::BAD_REQUEST,
            LibraryError::ImageOutsideRoots { .. } => StatusCode::FORBIDDEN,
            LibraryError::CharacterNotFound { .. }
            | LibraryError::ChatNotFound { .. }
            | LibraryError::ImageNotFound { .. } => StatusCode::NOT_FOUND,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Runs filesystem-bound library work off the async executor.
async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&Library) -> Result<T, LibraryError> + Send + 'static,
{
    let library = state.library.clone();
    tokio::task::spawn_blocking(move || f(&library))
        .await
        .map_err(|e| internal(format!("scan task failed: {}", e)))?
        .map_err(AppError::from)
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

// ============ GET /api/roots ============

#[derive(Serialize)]
struct RootsResponse {
    roots: Vec<String>,
}

async fn handle_roots(State(state): State<AppState>) -> Json<RootsResponse> {
    Json(RootsResponse {
        roots: state.library.root_strings(),
    })
}

// ============ GET /api/scan ============

async fn handle_scan(State(state): State<AppState>) -> Result<Json<ScanSummary>, AppError> {
    let summary = blocking(&state, |lib| Ok(lib.summary(image_locator))).await?;
    Ok(Json(summary))
}

// ============ GET /api/chat ============

#[derive(Deserialize)]
struct ChatQuery {
    #[serde(rename = "char")]
    character: Option<String>,
    file: Option<String>,
}

async fn handle_chat(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<Json<ChatView>, AppError> {
    let view = blocking(&state, move |lib| {
        lib.get_chat(
            query.character.as_deref(),
            query.file.as_deref(),
            image_locator,
        )
    })
    .await?;
    Ok(Json(view))
}

// ============ GET /api/images ============

#[derive(Deserialize)]
struct ImagesQuery {
    #[serde(rename = "char")]
    character: Option<String>,
}

#[derive(Serialize)]
struct ImagesResponse {
    images: Vec<ImageView>,
}

async fn handle_images(
    State(state): State<AppState>,
    Query(query): Query<ImagesQuery>,
) -> Result<Json<ImagesResponse>, AppError> {
    let images = blocking(&state, move |lib| {
        Ok(lib.gallery_views(query.character.as_deref(), image_locator))
    })
    .await?;
    Ok(Json(ImagesResponse { images }))
}

// ============ GET /api/characters/{name}/images ============

async fn handle_character_images(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ImagesResponse>, AppError> {
    let images = blocking(&state, move |lib| lib.images_for_character(Some(&name))).await?;
    let images = images
        .into_iter()
        .map(|img| ImageView {
            url: image_locator(&img.path),
            name: img.file_name,
            dir: img.dir_label,
        })
        .collect();
    Ok(Json(ImagesResponse { images }))
}

// ============ GET /api/image ============

#[derive(Deserialize)]
struct ImageQuery {
    path: Option<String>,
}

async fn handle_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, AppError> {
    let path = blocking(&state, move |lib| lib.resolve_image(query.path.as_deref())).await?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        debug!("cannot read {}: {}", path.display(), e);
        AppError::from(LibraryError::ImageNotFound { path: path.clone() })
    })?;
    Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response())
}
