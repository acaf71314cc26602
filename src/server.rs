//! Administrative HTTP server.
//!
//! Exposes the indexer over a small JSON API so a local UI or script can
//! inspect and manage what this machine has uploaded.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/config` | Current configuration (token masked) |
//! | `POST` | `/api/config` | Merge updates into `settings.toml` and reload |
//! | `GET`  | `/api/status` | Server status and project count |
//! | `GET`  | `/api/projects` | All indexed projects with blob counts |
//! | `POST` | `/api/projects/check` | Whether a path is indexed |
//! | `POST` | `/api/projects/details` | Blob count plus live file-type stats |
//! | `POST` | `/api/projects/reindex` | Run a full index pass, return the report |
//! | `DELETE` | `/api/projects/delete` | Drop a project from the local record |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "project_path is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser-based
//! management page can talk to the server directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ConfigHandle;
use crate::identity::{self, ProjectPath};
use crate::indexer;
use crate::models::IndexReport;
use crate::remote::RemoteClient;
use crate::scanner;
use crate::store::IndexStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live configuration handle; handlers take a snapshot per request.
    handle: Arc<ConfigHandle>,
    /// The local project record, serialized behind one async lock.
    store: Arc<Mutex<IndexStore>>,
}

impl AppState {
    pub fn new(handle: Arc<ConfigHandle>, store: IndexStore) -> Self {
        Self {
            handle,
            store: Arc::new(Mutex::new(store)),
        }
    }
}

/// Starts the administrative HTTP server on `bind`.
///
/// Runs until the process is terminated.
pub async fn run_server(
    handle: Arc<ConfigHandle>,
    store: IndexStore,
    bind: &str,
) -> anyhow::Result<()> {
    let app = router(AppState::new(handle, store));

    println!("Admin server listening on http://{}", bind);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router. Separate from [`run_server`] so tests can drive the
/// API over an ephemeral listener.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/config", get(handle_get_config).post(handle_update_config))
        .route("/api/status", get(handle_status))
        .route("/api/projects", get(handle_list_projects))
        .route("/api/projects/check", post(handle_check_project))
        .route("/api/projects/details", post(handle_project_details))
        .route("/api/projects/reindex", post(handle_reindex))
        .route("/api/projects/delete", delete(handle_delete_project))
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
    /// Machine-readable error code (e.g. `"bad_request"`, `"not_found"`).
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

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ Request bodies ============

#[derive(Deserialize)]
struct ProjectPathBody {
    #[serde(default)]
    project_path: Option<String>,
}

impl ProjectPathBody {
    /// Validates presence and resolves the path to its canonical identity.
    fn resolve(&self) -> Result<ProjectPath, AppError> {
        let input = self
            .project_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| bad_request("project_path is required"))?;
        identity::resolve(input).map_err(|e| bad_request(format!("Invalid project path: {}", e)))
    }
}

/// Partial configuration update. Absent fields keep their current values.
#[derive(Deserialize)]
struct ConfigUpdate {
    base_url: Option<String>,
    token: Option<String>,
    batch_size: Option<usize>,
    max_lines_per_blob: Option<usize>,
    text_extensions: Option<Vec<String>>,
    exclude_patterns: Option<Vec<String>>,
}

// ============ GET /api/config ============

#[derive(Serialize)]
struct ConfigResponse {
    index_storage_path: String,
    batch_size: usize,
    max_lines_per_blob: usize,
    base_url: String,
    /// `"***"` when a token is set, empty otherwise.
    token: String,
    token_full: String,
    text_extensions: Vec<String>,
    exclude_patterns: Vec<String>,
}

async fn handle_get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let config = state.handle.snapshot();

    let mut extensions: Vec<String> = config.text_extensions.iter().cloned().collect();
    extensions.sort();

    Json(ConfigResponse {
        index_storage_path: config.data_dir.display().to_string(),
        batch_size: config.batch_size,
        max_lines_per_blob: config.max_lines_per_blob,
        base_url: config.base_url.clone(),
        token: if config.token.is_empty() {
            String::new()
        } else {
            "***".to_string()
        },
        token_full: config.token.clone(),
        text_extensions: extensions,
        exclude_patterns: config
            .exclude_patterns
            .iter()
            .map(|p| p.pattern().to_string())
            .collect(),
    })
}

// ============ POST /api/config ============

async fn handle_update_config(
    State(state): State<AppState>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.handle.settings_path().exists() {
        return Err(not_found("User configuration file not found"));
    }

    let mut patch = toml::Table::new();
    if let Some(base_url) = update.base_url {
        patch.insert("BASE_URL".to_string(), toml::Value::String(base_url));
    }
    if let Some(token) = update.token {
        patch.insert("TOKEN".to_string(), toml::Value::String(token));
    }
    if let Some(batch_size) = update.batch_size {
        patch.insert(
            "BATCH_SIZE".to_string(),
            toml::Value::Integer(batch_size as i64),
        );
    }
    if let Some(max_lines) = update.max_lines_per_blob {
        patch.insert(
            "MAX_LINES_PER_BLOB".to_string(),
            toml::Value::Integer(max_lines as i64),
        );
    }
    if let Some(extensions) = update.text_extensions {
        patch.insert(
            "TEXT_EXTENSIONS".to_string(),
            toml::Value::Array(extensions.into_iter().map(toml::Value::String).collect()),
        );
    }
    if let Some(patterns) = update.exclude_patterns {
        patch.insert(
            "EXCLUDE_PATTERNS".to_string(),
            toml::Value::Array(patterns.into_iter().map(toml::Value::String).collect()),
        );
    }

    state
        .handle
        .update(patch)
        .map_err(|e| bad_request(format!("Failed to update configuration: {}", e)))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Configuration updated and applied successfully!",
    })))
}

// ============ GET /api/status ============

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    project_count: usize,
    storage_path: String,
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let config = state.handle.snapshot();
    let store = state.store.lock().await;

    Json(StatusResponse {
        status: "running".to_string(),
        project_count: store.len(),
        storage_path: config.data_dir.display().to_string(),
    })
}

// ============ GET /api/projects ============

#[derive(Serialize)]
struct ProjectEntry {
    path: String,
    blob_count: usize,
}

#[derive(Serialize)]
struct ProjectListResponse {
    projects: Vec<ProjectEntry>,
}

async fn handle_list_projects(State(state): State<AppState>) -> Json<ProjectListResponse> {
    let store = state.store.lock().await;
    let projects = store
        .projects()
        .map(|(path, blob_count)| ProjectEntry {
            path: path.to_string(),
            blob_count,
        })
        .collect();
    Json(ProjectListResponse { projects })
}

// ============ POST /api/projects/check ============

#[derive(Serialize)]
struct CheckResponse {
    indexed: bool,
    blob_count: usize,
    normalized_path: String,
}

async fn handle_check_project(
    State(state): State<AppState>,
    Json(body): Json<ProjectPathBody>,
) -> Result<Json<CheckResponse>, AppError> {
    let project = body.resolve()?;
    let store = state.store.lock().await;
    let blob_count = store.get(&project.identity).len();

    Ok(Json(CheckResponse {
        indexed: blob_count > 0,
        blob_count,
        normalized_path: project.identity,
    }))
}

// ============ POST /api/projects/details ============

#[derive(Serialize)]
struct DetailsResponse {
    path: String,
    blob_count: usize,
    file_count: usize,
    file_type_stats: BTreeMap<String, usize>,
    indexed: bool,
}

async fn handle_project_details(
    State(state): State<AppState>,
    Json(body): Json<ProjectPathBody>,
) -> Result<Json<DetailsResponse>, AppError> {
    let project = body.resolve()?;

    let blob_count = {
        let store = state.store.lock().await;
        if !store.contains(&project.identity) {
            return Err(not_found("Project not found in index"));
        }
        store.get(&project.identity).len()
    };

    // Live stats from the working tree; unreadable entries are skipped.
    let config = state.handle.snapshot();
    let mut file_type_stats = BTreeMap::new();
    let mut file_count = 0;
    if project.root.is_dir() {
        for entry in scanner::scan(&project.root, &config).flatten() {
            if let Some((_, ext)) = entry.relative.rsplit_once('.') {
                *file_type_stats
                    .entry(format!(".{}", ext.to_ascii_lowercase()))
                    .or_insert(0) += 1;
                file_count += 1;
            }
        }
    }

    Ok(Json(DetailsResponse {
        path: project.identity,
        blob_count,
        file_count,
        file_type_stats,
        indexed: true,
    }))
}

// ============ POST /api/projects/reindex ============

async fn handle_reindex(
    State(state): State<AppState>,
    Json(body): Json<ProjectPathBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let project = body.resolve()?;
    let config = state.handle.snapshot();
    let client = RemoteClient::new(&config).map_err(|e| internal_error(e.to_string()))?;

    let report: IndexReport = {
        let mut store = state.store.lock().await;
        indexer::index_project(&config, &mut store, &client, &project)
            .await
            .map_err(|e| internal_error(e.to_string()))?
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Project reindexed successfully",
        "result": report,
    })))
}

// ============ DELETE /api/projects/delete ============

async fn handle_delete_project(
    State(state): State<AppState>,
    Json(body): Json<ProjectPathBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let project = body.resolve()?;

    let mut store = state.store.lock().await;
    let removed = store
        .remove(&project.identity)
        .map_err(|e| internal_error(e.to_string()))?;
    if !removed {
        return Err(not_found("Project not found in index"));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Project index deleted successfully",
        "deleted_path": project.identity,
    })))
}
