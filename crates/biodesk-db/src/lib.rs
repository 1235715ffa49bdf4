//! # biodesk-db
//!
//! PostgreSQL record store and blob storage for biodesk.
//!
//! This crate provides:
//! - Repository implementations for profiles, biodata, users, and admins
//! - The bucket-style blob store and its URL ⇄ object-name contract
//! - In-memory stores with failure injection for tests
//! - Connection pool management and migrations

pub mod biodata;
pub mod blob_storage;
pub mod memory;
pub mod pool;
pub mod profiles;
pub mod users;

pub use biodesk_core::*;

pub use biodata::PgBioDataRepository;
pub use blob_storage::{
    blob_path_from_url, new_object_name, object_url, validate_object_name, BucketBlobStore,
    FilesystemBackend, StorageBackend, ADDRESS_SCHEME_VERSION,
};
pub use memory::{
    MemoryAdminRepository, MemoryBioDataRepository, MemoryBlobStore, MemoryProfileRepository,
    MemoryUserRepository,
};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use profiles::PgProfileRepository;
pub use users::{hash_password, verify_password, PgAdminRepository, PgUserRepository};

/// Database handle holding every repository over one pool.
#[derive(Clone)]
pub struct Database {
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub profiles: PgProfileRepository,
    pub biodata: PgBioDataRepository,
    pub users: PgUserRepository,
    pub admins: PgAdminRepository,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            profiles: PgProfileRepository::new(pool.clone()),
            biodata: PgBioDataRepository::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            admins: PgAdminRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations from the workspace `migrations/` directory.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
