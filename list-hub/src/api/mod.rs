//! HTTP API layer exposing folder persistence under `/api/folders`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use list_hub_core::{Document, Folder, FolderService, FolderUpdate, HubError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

pub type SharedService = Arc<Mutex<FolderService>>;

/// Shared application state containing the folder service.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedService,
}

/// Handler error rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(HubError);

impl From<HubError> for ApiError {
    fn from(value: HubError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            HubError::InvalidInput(msg) | HubError::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            HubError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            HubError::Storage(msg) => {
                error!("storage failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to save folders".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Unwrap a JSON body, turning a malformed one into a 400 with `message`.
fn body<T>(payload: Result<Json<T>, JsonRejection>, message: &str) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| {
            tracing::debug!("rejected request body: {}", rejection);
            HubError::InvalidInput(message.to_string()).into()
        })
}

#[derive(Deserialize)]
struct CreateFolderRequest {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest {
    #[serde(default)]
    folders: Option<Vec<Folder>>,
    #[serde(default)]
    current_folder_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    message: &'static str,
    current_folder_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentFolderResponse {
    current_folder_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveResponse {
    message: &'static str,
    folders: Vec<Folder>,
    current_folder_id: String,
}

pub fn router(store: SharedService) -> Router {
    let app_state = AppState { store };
    Router::new()
        .route("/api/folders", get(list_folders).post(create_folder))
        .route("/api/folders/save", post(save_all))
        .route("/api/folders/current/{id}", put(switch_folder))
        .route(
            "/api/folders/{id}",
            get(get_folder).put(update_folder).delete(delete_folder),
        )
        .with_state(app_state)
}

/// Full application: API routes, root and health endpoints, CORS and
/// request tracing.
pub fn app(store: SharedService) -> Router {
    Router::new()
        .merge(router(store))
        .route("/", get(root))
        .route("/health", get(|| async { "OK" }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Server is running! Use /api/folders to access the API."
    }))
}

async fn list_folders(State(state): State<AppState>) -> Result<Json<Document>, ApiError> {
    let store = state.store.lock().await;
    Ok(Json(store.list()?))
}

async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Folder>, ApiError> {
    let store = state.store.lock().await;
    Ok(Json(store.get(&id)?))
}

async fn create_folder(
    State(state): State<AppState>,
    payload: Result<Json<CreateFolderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Folder>), ApiError> {
    let req = body(payload, "Folder name is required")?;
    let store = state.store.lock().await;
    let folder = store.create(req.name.as_deref().unwrap_or_default())?;
    Ok((StatusCode::CREATED, Json(folder)))
}

async fn update_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<FolderUpdate>, JsonRejection>,
) -> Result<Json<Folder>, ApiError> {
    let update = body(payload, "Invalid folder data")?;
    let store = state.store.lock().await;
    Ok(Json(store.update(&id, update)?))
}

async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let store = state.store.lock().await;
    let current_folder_id = store.delete(&id)?;
    Ok(Json(DeleteResponse {
        message: "Folder deleted successfully",
        current_folder_id,
    }))
}

async fn switch_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CurrentFolderResponse>, ApiError> {
    let store = state.store.lock().await;
    let current_folder_id = store.switch(&id)?;
    Ok(Json(CurrentFolderResponse { current_folder_id }))
}

async fn save_all(
    State(state): State<AppState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let req = body(payload, "Invalid folders data")?;
    let store = state.store.lock().await;
    let saved = store.save_all(req.folders, req.current_folder_id)?;
    Ok(Json(SaveResponse {
        message: "State saved successfully",
        folders: saved.folders,
        current_folder_id: saved.current_folder_id,
    }))
}
