//! Serves stored blobs at the URLs the blob store hands out.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use biodesk_core::detect_content_type;

use crate::{ApiError, AppState};

/// `GET /v0/b/{bucket}/o/{object}`. The `alt=media` query is accepted and ignored.
pub async fn serve_blob(
    State(state): State<AppState>,
    Path((bucket, object)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    if bucket != state.blob_bucket {
        return Err(ApiError::NotFound("Blob not found".to_string()));
    }

    let url = state.blobs.object_url(&object);
    let data = state.blobs.read(&url).await?;
    let content_type = detect_content_type(&data, "application/octet-stream");

    Ok(([(header::CONTENT_TYPE, content_type)], data))
}
