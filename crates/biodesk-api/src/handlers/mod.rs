//! HTTP handlers for biodesk-api.
//!
//! Handlers stay thin: decode the request, call the lifecycle service or a
//! repository, encode the response. Every failure leaves as [`ApiError`].

pub mod biodata;
pub mod blobs;
pub mod extraction;
pub mod health;
pub mod multipart;
pub mod profiles;
pub mod users;

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, Uri};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use biodesk_core::{BlobCleanupFailure, DeleteOutcome};

use crate::error::BODY_TOO_LARGE;
use crate::ApiError;

/// Parse a record id from a path segment.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", raw)))
}

/// Unwrap a JSON body, keeping the `{"error": ...}` shape on rejection.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(BODY_TOO_LARGE.to_string()),
            _ => ApiError::BadRequest(rejection.body_text()),
        })
}

/// Router fallback for unknown paths.
pub(crate) async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route not found: {}", uri.path()))
}

/// Body of a successful delete. `warnings` lists blobs left orphaned.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub deleted: Uuid,
    pub warnings: Vec<BlobCleanupFailure>,
}

impl From<DeleteOutcome> for DeletedResponse {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            deleted: outcome.id,
            warnings: outcome.blob_failures,
        }
    }
}

/// Body of a successful update: the record, plus orphaned old blobs if any.
#[derive(Debug, Serialize)]
pub struct UpdatedResponse<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<BlobCleanupFailure>,
}

impl<T> From<biodesk_core::UpdateOutcome<T>> for UpdatedResponse<T> {
    fn from(outcome: biodesk_core::UpdateOutcome<T>) -> Self {
        Self {
            record: outcome.record,
            warnings: outcome.cleanup_failures,
        }
    }
}
