//! # biodesk-api
//!
//! HTTP surface for biodesk: profile and biodata records with photo
//! attachments, user access management, and free-text biodata extraction.
//!
//! The binary wires PostgreSQL, the filesystem blob store and the OpenAI
//! client into [`AppState`]; tests wire the in-memory stores instead.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use uuid::Uuid;

use biodesk_core::{AdminRepository, BlobStore, ExtractionClient, UserRepository};

pub use auth::{AuthUser, TokenVerifier};
pub use config::{CorsOrigins, ServerConfig};
pub use error::ApiError;
pub use services::RecordLifecycle;

/// Shared handles, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<RecordLifecycle>,
    pub users: Arc<dyn UserRepository>,
    pub admins: Arc<dyn AdminRepository>,
    pub blobs: Arc<dyn BlobStore>,
    /// Bucket segment accepted by the blob serving route.
    pub blob_bucket: String,
    pub extractor: Arc<dyn ExtractionClient>,
    pub tokens: Arc<TokenVerifier>,
}

/// Router-level settings that do not live in [`AppState`].
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub cors_origins: CorsOrigins,
    pub max_body_bytes: usize,
}

impl From<&ServerConfig> for RouterOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            cors_origins: config.cors_origins.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// UUIDv7 request IDs, time-ordered for log correlation.
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biodesk API",
        description = "Profile and biodata records with photo attachments, and biodata extraction from free text"
    ),
    paths(
        handlers::health::health_check,
        handlers::profiles::create_profile,
        handlers::profiles::list_profiles,
        handlers::profiles::get_profile,
        handlers::profiles::update_profile,
        handlers::profiles::delete_profile,
        handlers::biodata::create_biodata,
        handlers::biodata::list_biodata,
        handlers::biodata::list_years,
        handlers::biodata::get_biodata,
        handlers::biodata::update_biodata,
        handlers::biodata::delete_biodata,
        handlers::users::register_user,
        handlers::users::admin_login,
        handlers::users::update_access,
        handlers::extraction::extract,
    ),
    components(schemas(
        biodesk_core::ProfileFields,
        biodesk_core::ProfileRecord,
        biodesk_core::ProfileSummary,
        biodesk_core::BioField,
        biodesk_core::BioDataRecord,
        biodesk_core::UserRecord,
        biodesk_core::BlobCleanupFailure,
        biodesk_core::ExtractionItem,
        biodesk_core::ExtractionResult,
        handlers::DeletedResponse,
        handlers::profiles::ProfileCreatedResponse,
        handlers::users::UserSessionResponse,
        handlers::users::AdminLoginRequest,
        handlers::users::AdminLoginResponse,
        handlers::users::AccessUpdateRequest,
        handlers::extraction::ExtractRequest,
    )),
    tags(
        (name = "Profiles", description = "Profile records with two photos"),
        (name = "Biodata", description = "Open label/value records with an optional image"),
        (name = "Users", description = "User sessions and admin access grants"),
        (name = "Extraction", description = "Biodata extraction from free text"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    match origins {
        // Wildcard origins cannot be combined with credentials.
        CorsOrigins::Any => layer.allow_origin(Any).allow_headers(Any),
        CorsOrigins::List(list) => layer
            .allow_origin(AllowOrigin::list(list.clone()))
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static(auth::TOKEN_HEADER),
            ])
            .allow_credentials(true),
    }
}

/// Build the application router with its middleware stack.
pub fn build_router(state: AppState, options: &RouterOptions) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/api/openapi.json", get(openapi_json))
        // Records
        .route(
            "/api/profiles",
            post(handlers::profiles::create_profile).get(handlers::profiles::list_profiles),
        )
        .route(
            "/api/profiles/:id",
            get(handlers::profiles::get_profile)
                .put(handlers::profiles::update_profile)
                .delete(handlers::profiles::delete_profile),
        )
        .route(
            "/api/biodata",
            post(handlers::biodata::create_biodata).get(handlers::biodata::list_biodata),
        )
        .route("/api/biodata/years", get(handlers::biodata::list_years))
        .route(
            "/api/biodata/:id",
            get(handlers::biodata::get_biodata)
                .put(handlers::biodata::update_biodata)
                .delete(handlers::biodata::delete_biodata),
        )
        // Users
        .route("/api/users", post(handlers::users::register_user))
        .route("/api/users/:id", patch(handlers::users::update_access))
        .route("/api/adminlogin", post(handlers::users::admin_login))
        // Extraction
        .route(
            "/api/ai/extract-bio-data",
            post(handlers::extraction::extract),
        )
        // Stored blobs
        .route("/v0/b/:bucket/o/:object", get(handlers::blobs::serve_blob))
        .fallback(handlers::not_found)
        // Middleware
        // Enforced by the body extractors, so overruns surface as `ApiError`
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(&options.cors_origins))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}
