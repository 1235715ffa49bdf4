//! Biodata extraction from free text.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use biodesk_core::ExtractionResult;
use biodesk_inference::extract_bio_data;

use super::json_body;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractRequest {
    #[serde(default)]
    pub text: String,
}

/// Extract `{label, value}` items from free text.
///
/// An unparseable model answer is not an error: the response is
/// `{"items": [], "raw": "<model output>"}` for manual review.
///
/// # Returns
/// - 200 OK with the normalized items (or the degraded shape)
/// - 400 Bad Request if `text` is empty
/// - 502 Bad Gateway if the extraction service fails
#[utoipa::path(post, path = "/api/ai/extract-bio-data", tag = "Extraction",
    request_body = ExtractRequest,
    responses((status = 200, description = "Extraction result", body = ExtractionResult)))]
pub async fn extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let req = json_body(payload)?;
    let result = extract_bio_data(state.extractor.as_ref(), &req.text).await?;
    Ok(Json(result))
}
