//! biodesk-api server binary.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biodesk_api::{build_router, AppState, RecordLifecycle, RouterOptions, ServerConfig, TokenVerifier};
use biodesk_db::{BucketBlobStore, Database, FilesystemBackend, PoolConfig};
use biodesk_inference::OpenAIExtractionClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "biodesk_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "biodesk_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("biodesk-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;

    // Record store
    info!("Connecting to database...");
    let db = Database::connect_with_config(&config.database_url, PoolConfig::from_env()).await?;
    info!("Database connected");

    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Blob store
    let backend = FilesystemBackend::new(&config.blob_storage_path);
    backend
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("Blob storage at {} unusable: {}", config.blob_storage_path, e))?;
    let blobs = Arc::new(BucketBlobStore::new(
        backend,
        config.blob_bucket.clone(),
        config.blob_public_url.clone(),
    ));
    info!(
        subsystem = "storage",
        path = %config.blob_storage_path,
        bucket = %config.blob_bucket,
        "Blob storage ready"
    );

    // Extraction service
    let extractor = Arc::new(OpenAIExtractionClient::from_env()?);

    let lifecycle = RecordLifecycle::new(
        Arc::new(db.profiles.clone()),
        Arc::new(db.biodata.clone()),
        blobs.clone(),
    );

    let state = AppState {
        lifecycle: Arc::new(lifecycle),
        users: Arc::new(db.users.clone()),
        admins: Arc::new(db.admins.clone()),
        blobs,
        blob_bucket: config.blob_bucket.clone(),
        extractor,
        tokens: Arc::new(TokenVerifier::new(&config.jwt_secret)?),
    };

    let app = build_router(state, &RouterOptions::from(&config));

    // Start server
    let addr = config.socket_addr()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
