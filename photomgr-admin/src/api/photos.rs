//! Photo catalog API handlers
//!
//! GET /api/photos, PUT|DELETE /api/photos/:filename, POST /api/photos/batch,
//! POST /api/photos/upload

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use photomgr_common::RecordPatch;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    services::store_upload,
    AppState,
};

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "photo";
/// Request body cap of the upload route (camera originals exceed axum's default)
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Generic acknowledgement
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    fn success() -> Json<Self> {
        Json(Self { status: "success" })
    }
}

/// POST /api/photos/batch request
#[derive(Debug, Deserialize)]
pub struct BatchUpdateRequest {
    pub filenames: Vec<String>,
    #[serde(default)]
    pub updates: RecordPatch,
}

/// POST /api/photos/batch response
#[derive(Debug, Serialize)]
pub struct BatchUpdateResponse {
    pub status: &'static str,
    pub updated: usize,
    pub failed: usize,
}

/// POST /api/photos/upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub filename: String,
    pub year: String,
}

/// GET /api/photos
///
/// The persisted manifest, byte for byte.
pub async fn get_photos(State(state): State<AppState>) -> ApiResult<Response> {
    let bytes = state.photos.manifest().await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

/// PUT /api/photos/:filename
pub async fn update_photo(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Json(patch): Json<RecordPatch>,
) -> ApiResult<Json<StatusResponse>> {
    if filename.is_empty() {
        return Err(ApiError::BadRequest("Filename is required".to_string()));
    }
    state.photos.update(&filename, &patch).await?;
    Ok(StatusResponse::success())
}

/// DELETE /api/photos/:filename
///
/// Succeeds once the record is gone from the manifest; media cleanup
/// failures are only logged.
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let report = state.photos.delete(&filename).await?;
    tracing::debug!(filename = %filename, report = ?report, "Photo cleanup finished");
    Ok(StatusResponse::success())
}

/// POST /api/photos/batch
///
/// Never fails as a whole; per-photo failures are logged.
pub async fn batch_update(
    State(state): State<AppState>,
    Json(request): Json<BatchUpdateRequest>,
) -> Json<BatchUpdateResponse> {
    let outcome = state
        .photos
        .batch_update(&request.filenames, &request.updates)
        .await;

    Json(BatchUpdateResponse {
        status: "success",
        updated: outcome.updated,
        failed: outcome.failed.len(),
    })
}

/// POST /api/photos/upload
///
/// Stores the `photo` field under the inferred year. The photo appears in
/// the catalog after the next rebuild.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to parse form: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;

        let stored = store_upload(&state.images_root, &filename, &bytes).await?;
        return Ok(Json(UploadResponse {
            status: "success",
            filename: stored.filename,
            year: stored.year,
        }));
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}

/// Build photo catalog routes
pub fn photo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/photos", get(get_photos))
        .route("/api/photos/batch", post(batch_update))
        .route(
            "/api/photos/upload",
            post(upload_photo).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/photos/:filename", put(update_photo).delete(delete_photo))
}
