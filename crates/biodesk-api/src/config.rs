//! Server configuration from environment variables.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use biodesk_core::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/biodesk";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BLOB_STORAGE_PATH: &str = "./data/blobs";
pub const DEFAULT_BLOB_BUCKET: &str = "biodesk";
pub const DEFAULT_BLOB_PUBLIC_URL: &str = "http://localhost:5000";

/// 10 MB, enough for two phone photos in one multipart body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Allowed CORS origins.
#[derive(Debug, Clone, PartialEq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub blob_storage_path: String,
    pub blob_bucket: String,
    pub blob_public_url: String,
    pub jwt_secret: String,
    pub cors_origins: CorsOrigins,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Config("JWT_SECRET must be set".to_string()))?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("MAX_BODY_BYTES is not a number: {}", raw)))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            database_url: var("DATABASE_URL", DEFAULT_DATABASE_URL),
            host: var("HOST", DEFAULT_HOST),
            port,
            blob_storage_path: var("BLOB_STORAGE_PATH", DEFAULT_BLOB_STORAGE_PATH),
            blob_bucket: var("BLOB_BUCKET", DEFAULT_BLOB_BUCKET),
            blob_public_url: var("BLOB_PUBLIC_URL", DEFAULT_BLOB_PUBLIC_URL),
            jwt_secret,
            cors_origins: parse_allowed_origins(&var("CORS_ALLOWED_ORIGINS", "*")),
            max_body_bytes,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address: {}", e)))
    }
}

/// Parse a comma-separated origin list; `*` or an empty list allows any origin.
pub fn parse_allowed_origins(raw: &str) -> CorsOrigins {
    if raw.trim().is_empty() || raw.split(',').any(|s| s.trim() == "*") {
        return CorsOrigins::Any;
    }

    let origins: Vec<HeaderValue> = raw
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect();

    if origins.is_empty() {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}
