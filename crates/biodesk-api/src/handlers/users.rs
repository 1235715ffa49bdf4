//! User session, admin login, and access grants.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use biodesk_core::{ProfileRecord, UserRecord};
use biodesk_db::verify_password;

use super::{json_body, parse_id};
use crate::auth::AuthUser;
use crate::{ApiError, AppState};

/// Response for `POST /api/users`.
///
/// `profiles` is `null` until an admin grants the user access.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSessionResponse {
    pub user: UserRecord,
    pub profiles: Option<Vec<ProfileRecord>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    pub admin_name: String,
    pub admin_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    pub admin_name: String,
    pub users: Vec<UserRecord>,
}

/// Grant or revoke a user's access to full profiles.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessUpdateRequest {
    pub access: bool,
    /// Name of the admin performing the change.
    pub admin: String,
}

/// Look up (or register) the caller identified by `x-token`.
///
/// Users with access also receive every full profile.
#[utoipa::path(post, path = "/api/users", tag = "Users",
    responses(
        (status = 200, description = "User and, if granted, profiles", body = UserSessionResponse),
        (status = 400, description = "Missing x-token"),
        (status = 401, description = "Invalid token")))]
pub async fn register_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<UserSessionResponse>, ApiError> {
    let user = match state.users.find_by_google_id(&principal.id).await? {
        Some(user) => user,
        None => {
            let user = state.users.insert(&principal.email, &principal.id).await?;
            info!(subsystem = "api", user_id = %user.id, "User registered");
            user
        }
    };

    let profiles = if user.access {
        Some(state.lifecycle.list_profiles_full().await?)
    } else {
        None
    };

    Ok(Json(UserSessionResponse { user, profiles }))
}

#[utoipa::path(post, path = "/api/adminlogin", tag = "Users",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Admin name and all users", body = AdminLoginResponse),
        (status = 401, description = "Invalid Credentials")))]
pub async fn admin_login(
    State(state): State<AppState>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<Json<AdminLoginResponse>, ApiError> {
    let req = json_body(payload)?;
    let invalid = || ApiError::Unauthorized("Invalid Credentials".to_string());

    let admin = state
        .admins
        .find_by_name(&req.admin_name)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&req.admin_password, &admin.password_hash) {
        return Err(invalid());
    }

    let users = state.users.list().await?;
    info!(subsystem = "api", admin = %admin.admin_name, "Admin logged in");
    Ok(Json(AdminLoginResponse {
        admin_name: admin.admin_name,
        users,
    }))
}

#[utoipa::path(patch, path = "/api/users/{id}", tag = "Users",
    request_body = AccessUpdateRequest,
    responses(
        (status = 200, description = "Updated user", body = UserRecord),
        (status = 403, description = "Unauthorized: Invalid Admin"),
        (status = 404, description = "User not found")))]
pub async fn update_access(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AccessUpdateRequest>, JsonRejection>,
) -> Result<Json<UserRecord>, ApiError> {
    let id = parse_id(&id)?;
    let req = json_body(payload)?;

    if state.admins.find_by_name(&req.admin).await?.is_none() {
        return Err(ApiError::Forbidden("Unauthorized: Invalid Admin".to_string()));
    }

    let user = state
        .users
        .set_access(id, req.access)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(
        subsystem = "api",
        user_id = %user.id,
        access = user.access,
        admin = %req.admin,
        "User access changed"
    );
    Ok(Json(user))
}
