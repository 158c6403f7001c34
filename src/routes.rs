use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::ServiceError;
use crate::jobs::JobResponse;
use crate::state::AppState;
use crate::translate::{supported_languages, Language};

type ApiError = (StatusCode, Json<Value>);

/// Multipart framing allowance on top of the configured file size.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Full application: routes, CORS, tracing and the upload size limit.
pub fn app(state: AppState) -> Router {
    let system_config = &state.config.system_config;
    let cors = cors_layer(&system_config.cors_origins);
    let body_limit = system_config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .merge(create_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api/translate",
            Router::new()
                .route("/upload", post(upload_document))
                .route("/status/:job_id", get(get_status))
                .route("/translate/:job_id", post(start_translation))
                .route("/download/:job_id", get(download_translated_document))
                .route("/jobs", get(list_jobs))
                .route("/languages", get(get_languages)),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn detail(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({"detail": message.into()})))
}

fn error_response(err: ServiceError) -> ApiError {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    detail(status, err.to_string())
}

async fn health_check() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<JobResponse>, ApiError> {
    let max_bytes = state.config.system_config.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| detail(e.status(), e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| detail(StatusCode::BAD_REQUEST, "Uploaded file has no filename"))?;
        let content = field
            .bytes()
            .await
            .map_err(|e| detail(e.status(), e.body_text()))?;

        info!("Received upload {} ({} bytes)", filename, content.len());
        if content.len() > max_bytes {
            return Err(detail(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File exceeds {} bytes", max_bytes),
            ));
        }

        let job = state
            .service
            .create_job(&filename, content.to_vec())
            .await
            .map_err(error_response)?;
        return Ok(Json(JobResponse::from(&job)));
    }

    Err(detail(StatusCode::UNPROCESSABLE_ENTITY, "No file provided"))
}

async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    state
        .service
        .get_job(&job_id)
        .map(|job| Json(JobResponse::from(&job)))
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Job not found"))
}

#[derive(Debug, Deserialize)]
struct TranslateParams {
    target_language: Option<String>,
}

async fn start_translation(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(params): Query<TranslateParams>,
) -> Result<Json<JobResponse>, ApiError> {
    let target_language = params
        .target_language
        .unwrap_or_else(|| state.config.system_config.default_target_language.clone());

    let job = state
        .service
        .start_translation(&job_id, &target_language)
        .await
        .map_err(error_response)?;
    Ok(Json(JobResponse::from(&job)))
}

async fn download_translated_document(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let (path, filename) = state
        .service
        .output_for_download(&job_id)
        .map_err(error_response)?;

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        error!("Failed to read output {:?}: {}", path, e);
        detail(StatusCode::INTERNAL_SERVER_ERROR, "Translated file is unavailable")
    })?;

    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobResponse>> {
    Json(state.service.list_jobs().iter().map(JobResponse::from).collect())
}

async fn get_languages() -> Json<Vec<Language>> {
    Json(supported_languages())
}
