//! Profile HTTP handlers.
//!
//! Profiles are created and updated through multipart forms carrying the
//! scalar fields as text parts and the photos as `photo1` / `photo2` files.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use biodesk_core::validation::{profile_fields_from_form, profile_patch_from_form};
use biodesk_core::{ProfileRecord, ProfileSummary};

use super::multipart::read_multipart;
use super::{parse_id, DeletedResponse, UpdatedResponse};
use crate::{ApiError, AppState};

/// Response for a created profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileCreatedResponse {
    pub message: String,
    pub profile: ProfileRecord,
}

/// Create a profile with both photos.
///
/// # Multipart Fields
/// - every required profile field as text (`fullName`, `fatherName`, ...)
/// - `message` (optional)
/// - `photo1`, `photo2`: image files (both required)
///
/// # Returns
/// - 201 Created with the stored profile
/// - 400 Bad Request if a field or photo is missing, or a photo is not an image
/// - 409 Conflict if the mobile number is already registered
/// - 502 Bad Gateway if the blob store rejects an upload
#[utoipa::path(post, path = "/api/profiles", tag = "Profiles",
    responses((status = 201, description = "Profile created", body = ProfileCreatedResponse)))]
pub async fn create_profile(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProfileCreatedResponse>), ApiError> {
    let form = read_multipart(multipart).await?;
    let fields = profile_fields_from_form(&form.fields)?;
    let profile = state.lifecycle.create_profile(fields, form.files).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProfileCreatedResponse {
            message: "Profile uploaded successfully".to_string(),
            profile,
        }),
    ))
}

/// List profile summaries (name, age, occupation, current address).
#[utoipa::path(get, path = "/api/profiles", tag = "Profiles",
    responses((status = 200, description = "Profile summaries", body = [ProfileSummary])))]
pub async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileSummary>>, ApiError> {
    Ok(Json(state.lifecycle.list_profiles().await?))
}

#[utoipa::path(get, path = "/api/profiles/{id}", tag = "Profiles",
    responses(
        (status = 200, description = "Full profile", body = ProfileRecord),
        (status = 404, description = "Unknown profile")))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.lifecycle.get_profile(id).await?))
}

/// Update a profile.
///
/// Only the text fields sent are changed. A sent photo replaces the stored
/// one; the old blob is removed after the record is saved, and any blob that
/// could not be removed is listed under `warnings`.
#[utoipa::path(put, path = "/api/profiles/{id}", tag = "Profiles",
    responses(
        (status = 200, description = "Updated profile", body = ProfileRecord),
        (status = 404, description = "Unknown profile")))]
pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<UpdatedResponse<ProfileRecord>>, ApiError> {
    let id = parse_id(&id)?;
    let form = read_multipart(multipart).await?;
    let patch = profile_patch_from_form(&form.fields)?;
    let outcome = state.lifecycle.update_profile(id, patch, form.files).await?;
    Ok(Json(outcome.into()))
}

/// Delete a profile and its photos.
///
/// The record is removed even if a photo cannot be; such photos are listed
/// under `warnings`.
#[utoipa::path(delete, path = "/api/profiles/{id}", tag = "Profiles",
    responses(
        (status = 200, description = "Profile deleted", body = DeletedResponse),
        (status = 404, description = "Unknown profile")))]
pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = parse_id(&id)?;
    let outcome = state.lifecycle.delete_profile(id).await?;
    Ok(Json(outcome.into()))
}
