//! Biodata HTTP handlers.
//!
//! Create and update take a multipart form:
//! - `data`: JSON array of `{label, value}` objects
//! - `isMale`: `true` / `false` (optional, defaults to `true` on create)
//! - `image`: image file (optional)

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use biodesk_core::validation::{bio_fields_from_json, check_slots, parse_bool, FormFields};
use biodesk_core::{AttachmentSlot, BioDataInput, BioDataPatch, BioDataRecord, UploadedFile};

use super::multipart::{read_multipart, MultipartForm};
use super::{parse_id, DeletedResponse, UpdatedResponse};
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BioDataListQuery {
    /// Only records with this derived birth year.
    pub year: Option<String>,
}

fn patch_from_form(form: &FormFields) -> Result<BioDataPatch, ApiError> {
    let data = form
        .get("data")
        .map(|raw| bio_fields_from_json(raw))
        .transpose()?;
    let is_male = form
        .get("isMale")
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_bool("isMale", raw))
        .transpose()?;
    Ok(BioDataPatch { data, is_male })
}

/// The optional `image` part; any other file part is rejected.
fn single_image(form: &mut MultipartForm) -> Result<Option<UploadedFile>, ApiError> {
    check_slots(&[AttachmentSlot::Image], &form.files)?;
    Ok(form.take_file(AttachmentSlot::Image))
}

#[utoipa::path(post, path = "/api/biodata", tag = "Biodata",
    responses((status = 201, description = "Biodata created", body = BioDataRecord)))]
pub async fn create_biodata(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<BioDataRecord>), ApiError> {
    let mut form = read_multipart(multipart).await?;
    let patch = patch_from_form(&form.fields)?;
    let data = patch
        .data
        .ok_or_else(|| ApiError::BadRequest("data is required".to_string()))?;
    let image = single_image(&mut form)?;

    let input = BioDataInput {
        data,
        is_male: patch.is_male,
    };
    let record = state.lifecycle.create_biodata(input, image).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// List biodata records, newest first.
///
/// `?year=1994` restricts the list to one derived birth year.
#[utoipa::path(get, path = "/api/biodata", tag = "Biodata",
    params(BioDataListQuery),
    responses((status = 200, description = "Biodata records", body = [BioDataRecord])))]
pub async fn list_biodata(
    State(state): State<AppState>,
    Query(query): Query<BioDataListQuery>,
) -> Result<Json<Vec<BioDataRecord>>, ApiError> {
    let year = match query.year.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i32>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid year: {}", raw)))?,
        ),
    };
    Ok(Json(state.lifecycle.list_biodata(year).await?))
}

/// Distinct birth years, ascending.
#[utoipa::path(get, path = "/api/biodata/years", tag = "Biodata",
    responses((status = 200, description = "Sorted distinct birth years", body = [i32])))]
pub async fn list_years(State(state): State<AppState>) -> Result<Json<Vec<i32>>, ApiError> {
    Ok(Json(state.lifecycle.distinct_years().await?))
}

#[utoipa::path(get, path = "/api/biodata/{id}", tag = "Biodata",
    responses(
        (status = 200, description = "Biodata record", body = BioDataRecord),
        (status = 404, description = "Unknown record")))]
pub async fn get_biodata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BioDataRecord>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.lifecycle.get_biodata(id).await?))
}

/// Update a biodata record; a sent `image` replaces the stored one.
#[utoipa::path(put, path = "/api/biodata/{id}", tag = "Biodata",
    responses(
        (status = 200, description = "Updated record", body = BioDataRecord),
        (status = 404, description = "Unknown record")))]
pub async fn update_biodata(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<UpdatedResponse<BioDataRecord>>, ApiError> {
    let id = parse_id(&id)?;
    let mut form = read_multipart(multipart).await?;
    let patch = patch_from_form(&form.fields)?;
    let image = single_image(&mut form)?;

    let outcome = state.lifecycle.update_biodata(id, patch, image).await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(delete, path = "/api/biodata/{id}", tag = "Biodata",
    responses(
        (status = 200, description = "Record deleted", body = DeletedResponse),
        (status = 404, description = "Unknown record")))]
pub async fn delete_biodata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = parse_id(&id)?;
    let outcome = state.lifecycle.delete_biodata(id).await?;
    Ok(Json(outcome.into()))
}
