//! Core traits for biodesk abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability. Handles are
//! constructed once at process start and shared behind `Arc`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// RECORD STORE TRAITS
// =============================================================================

/// Repository for profile records.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Insert a new profile; the store assigns id and creation time.
    async fn insert(&self, profile: NewProfile) -> Result<ProfileRecord>;

    /// Fetch a profile by id.
    async fn fetch(&self, id: Uuid) -> Result<Option<ProfileRecord>>;

    /// Overwrite scalar fields and attachment URLs of an existing profile.
    ///
    /// Returns `Error::NotFound` if the record no longer exists.
    async fn update(&self, profile: &ProfileRecord) -> Result<ProfileRecord>;

    /// Delete a profile. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Reduced projections of every profile.
    async fn list_summaries(&self) -> Result<Vec<ProfileSummary>>;

    /// Every profile in full.
    async fn list_all(&self) -> Result<Vec<ProfileRecord>>;
}

/// Repository for biodata records.
#[async_trait]
pub trait BioDataRepository: Send + Sync {
    /// Insert a new biodata record; the store assigns id and creation time.
    async fn insert(&self, biodata: NewBioData) -> Result<BioDataRecord>;

    /// Fetch a biodata record by id.
    async fn fetch(&self, id: Uuid) -> Result<Option<BioDataRecord>>;

    /// Overwrite data, derived year, gender flag and image URL.
    ///
    /// Returns `Error::NotFound` if the record no longer exists.
    async fn update(&self, biodata: &BioDataRecord) -> Result<BioDataRecord>;

    /// Delete a record. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Full records, newest first, optionally restricted to one birth year.
    async fn list(&self, birth_year: Option<i32>) -> Result<Vec<BioDataRecord>>;

    /// Sorted distinct non-null birth years.
    async fn distinct_birth_years(&self) -> Result<Vec<i32>>;
}

/// Repository for end users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by identity-provider subject.
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<UserRecord>>;

    /// Create a user with access and payment flags off.
    async fn insert(&self, email: &str, google_id: &str) -> Result<UserRecord>;

    /// All users.
    async fn list(&self) -> Result<Vec<UserRecord>>;

    /// Set the access flag. Returns `None` if the user does not exist.
    async fn set_access(&self, id: Uuid, access: bool) -> Result<Option<UserRecord>>;
}

/// Repository for administrators.
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Find an administrator by name.
    async fn find_by_name(&self, admin_name: &str) -> Result<Option<AdminRecord>>;
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// Client for the external blob store.
///
/// Blobs are addressed by the URL returned from `put`; `delete` derives the
/// store-relative path from that URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a fresh object name derived from `filename`.
    async fn put(&self, filename: &str, data: &[u8], content_type: &str) -> Result<String>;

    /// Read a blob by its URL.
    async fn read(&self, url: &str) -> Result<Vec<u8>>;

    /// Delete a blob by its URL.
    async fn delete(&self, url: &str) -> Result<()>;

    /// Public URL of a store-relative object name.
    fn object_url(&self, object_name: &str) -> String;
}

// =============================================================================
// EXTRACTION SERVICE
// =============================================================================

/// Capability interface to the external extraction service.
///
/// Returns the raw completion text; callers must not assume it is valid JSON.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Send a request and return the raw response text.
    async fn send(&self, request: &ExtractionRequest) -> Result<String>;

    /// Identifier of the backend, for logging.
    fn backend_name(&self) -> &str;
}
