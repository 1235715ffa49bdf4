//! In-memory stores for tests and local development.
//!
//! These implement the same traits as the PostgreSQL repositories and the
//! bucket blob store, with switches for injecting write failures so
//! compensation paths can be exercised deterministically.
//!
//! ```rust,ignore
//! use biodesk_db::memory::MemoryBlobStore;
//!
//! let blobs = MemoryBlobStore::new("biodesk", "http://localhost:5000");
//! blobs.fail_put_for("b.jpg").await;
//! assert!(blobs.put("b.jpg", b"x", "image/jpeg").await.is_err());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use biodesk_core::{
    AdminRecord, AdminRepository, BioDataRecord, BioDataRepository, BlobStore, Error, NewBioData,
    NewProfile, ProfileRecord, ProfileRepository, ProfileSummary, Result, UserRecord,
    UserRepository,
};

use crate::blob_storage::{blob_path_from_url, new_object_name, object_url};

fn injected(op: &str) -> Error {
    Error::Internal(format!("injected {} failure", op))
}

// =============================================================================
// RECORD STORES
// =============================================================================

/// In-memory profile store. Mobile numbers are unique, as in PostgreSQL.
#[derive(Default)]
pub struct MemoryProfileRepository {
    records: Mutex<Vec<ProfileRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert and update fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

fn mobile_taken(records: &[ProfileRecord], mobile: &str, except: Option<Uuid>) -> bool {
    records
        .iter()
        .any(|r| r.fields.mobile == mobile && Some(r.id) != except)
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn insert(&self, profile: NewProfile) -> Result<ProfileRecord> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("profile insert"));
        }
        let mut records = self.records.lock().await;
        if mobile_taken(&records, &profile.fields.mobile, None) {
            return Err(Error::Conflict(
                "A profile with this mobile number already exists".to_string(),
            ));
        }
        let record = ProfileRecord {
            id: Uuid::now_v7(),
            fields: profile.fields,
            photo1: profile.photo1,
            photo2: profile.photo2,
            created_at: Utc::now(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<ProfileRecord>> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn update(&self, profile: &ProfileRecord) -> Result<ProfileRecord> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("profile update"));
        }
        let mut records = self.records.lock().await;
        if mobile_taken(&records, &profile.fields.mobile, Some(profile.id)) {
            return Err(Error::Conflict(
                "A profile with this mobile number already exists".to_string(),
            ));
        }
        let slot = records
            .iter_mut()
            .find(|r| r.id == profile.id)
            .ok_or_else(|| Error::NotFound("Profile not found".to_string()))?;
        *slot = profile.clone();
        Ok(slot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn list_summaries(&self) -> Result<Vec<ProfileSummary>> {
        Ok(self
            .list_all()
            .await?
            .iter()
            .map(ProfileSummary::from)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ProfileRecord>> {
        let records = self.records.lock().await;
        // v7 ids sort by creation time
        let mut all: Vec<_> = records.clone();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(all)
    }
}

/// In-memory biodata store.
#[derive(Default)]
pub struct MemoryBioDataRepository {
    records: Mutex<Vec<BioDataRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryBioDataRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert and update fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl BioDataRepository for MemoryBioDataRepository {
    async fn insert(&self, biodata: NewBioData) -> Result<BioDataRecord> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("biodata insert"));
        }
        let record = BioDataRecord {
            id: Uuid::now_v7(),
            image_url: biodata.image_url,
            data: biodata.data,
            birth_year: biodata.birth_year,
            is_male: biodata.is_male,
            created_at: Utc::now(),
        };
        self.records.lock().await.push(record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<BioDataRecord>> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn update(&self, biodata: &BioDataRecord) -> Result<BioDataRecord> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("biodata update"));
        }
        let mut records = self.records.lock().await;
        let slot = records
            .iter_mut()
            .find(|r| r.id == biodata.id)
            .ok_or_else(|| Error::NotFound("Biodata not found".to_string()))?;
        *slot = biodata.clone();
        Ok(slot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn list(&self, birth_year: Option<i32>) -> Result<Vec<BioDataRecord>> {
        let records = self.records.lock().await;
        let mut matching: Vec<_> = records
            .iter()
            .filter(|r| birth_year.is_none() || r.birth_year == birth_year)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(matching)
    }

    async fn distinct_birth_years(&self) -> Result<Vec<i32>> {
        let records = self.records.lock().await;
        let mut years: Vec<i32> = records.iter().filter_map(|r| r.birth_year).collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }
}

/// In-memory user store.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<Vec<UserRecord>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<UserRecord>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.google_id == google_id).cloned())
    }

    async fn insert(&self, email: &str, google_id: &str) -> Result<UserRecord> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.google_id == google_id) {
            return Err(Error::Conflict(
                "A user with this identity already exists".to_string(),
            ));
        }
        let user = UserRecord {
            id: Uuid::now_v7(),
            email: email.to_string(),
            google_id: google_id.to_string(),
            access: false,
            payment: false,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users.lock().await.clone())
    }

    async fn set_access(&self, id: Uuid, access: bool) -> Result<Option<UserRecord>> {
        let mut users = self.users.lock().await;
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.access = access;
            u.clone()
        }))
    }
}

/// In-memory admin store.
#[derive(Default)]
pub struct MemoryAdminRepository {
    admins: Mutex<Vec<AdminRecord>>,
}

impl MemoryAdminRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an administrator with a plaintext password.
    pub async fn add(&self, admin_name: &str, password: &str) -> Result<AdminRecord> {
        let admin = AdminRecord {
            id: Uuid::now_v7(),
            admin_name: admin_name.to_string(),
            password_hash: crate::users::hash_password(password)?,
        };
        self.admins.lock().await.push(admin.clone());
        Ok(admin)
    }
}

#[async_trait]
impl AdminRepository for MemoryAdminRepository {
    async fn find_by_name(&self, admin_name: &str) -> Result<Option<AdminRecord>> {
        let admins = self.admins.lock().await;
        Ok(admins.iter().find(|a| a.admin_name == admin_name).cloned())
    }
}

// =============================================================================
// BLOB STORE
// =============================================================================

/// In-memory [`BlobStore`] using the same URL scheme as the bucket store.
pub struct MemoryBlobStore {
    bucket: String,
    public_url: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_put: Mutex<HashSet<String>>,
    fail_delete: Mutex<HashSet<String>>,
    fail_all_deletes: AtomicBool,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            public_url: public_url.into(),
            objects: Mutex::new(HashMap::new()),
            fail_put: Mutex::new(HashSet::new()),
            fail_delete: Mutex::new(HashSet::new()),
            fail_all_deletes: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Fail any upload whose original filename is `filename`.
    pub async fn fail_put_for(&self, filename: &str) {
        self.fail_put.lock().await.insert(filename.to_string());
    }

    /// Fail deletion of the blob at `url`.
    pub async fn fail_delete_for(&self, url: &str) {
        self.fail_delete.lock().await.insert(url.to_string());
    }

    /// Fail every deletion until reset.
    pub fn set_fail_all_deletes(&self, fail: bool) {
        self.fail_all_deletes.store(fail, Ordering::SeqCst);
    }

    /// Whether the blob at `url` is currently stored.
    pub async fn contains(&self, url: &str) -> bool {
        match blob_path_from_url(url) {
            Ok(name) => self.objects.lock().await.contains_key(&name),
            Err(_) => false,
        }
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }

    /// Successful uploads so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Successful deletions so far.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, filename: &str, data: &[u8], _content_type: &str) -> Result<String> {
        if self.fail_put.lock().await.contains(filename) {
            return Err(Error::Storage(format!("upload of {} rejected", filename)));
        }
        let name = new_object_name(filename);
        self.objects.lock().await.insert(name.clone(), data.to_vec());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(object_url(&self.public_url, &self.bucket, &name))
    }

    async fn read(&self, url: &str) -> Result<Vec<u8>> {
        let name = blob_path_from_url(url)?;
        self.objects
            .lock()
            .await
            .get(&name)
            .cloned()
            .ok_or_else(|| Error::NotFound("Blob not found".to_string()))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        if self.fail_all_deletes.load(Ordering::SeqCst) || self.fail_delete.lock().await.contains(url)
        {
            return Err(Error::Storage(format!("delete of {} rejected", url)));
        }
        let name = blob_path_from_url(url)?;
        self.objects.lock().await.remove(&name);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn object_url(&self, object_name: &str) -> String {
        object_url(&self.public_url, &self.bucket, object_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biodesk_core::{BioField, ProfileFields};

    fn fields(mobile: &str) -> ProfileFields {
        ProfileFields {
            full_name: "Meera Iyer".to_string(),
            father_name: "Suresh Iyer".to_string(),
            mother_name: "Kala Iyer".to_string(),
            mobile: mobile.to_string(),
            age: 27,
            occupation: "Doctor".to_string(),
            experience: "3 years".to_string(),
            salary: "20 LPA".to_string(),
            current_address: "Chennai".to_string(),
            permanent_address: "Madurai".to_string(),
            height: "5'3\"".to_string(),
            message: None,
        }
    }

    #[tokio::test]
    async fn test_profile_mobile_is_unique() {
        let repo = MemoryProfileRepository::new();
        let new = |m: &str| NewProfile {
            fields: fields(m),
            photo1: None,
            photo2: None,
        };
        repo.insert(new("111")).await.unwrap();
        let err = repo.insert(new("111")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_biodata_list_filters_and_orders_newest_first() {
        let repo = MemoryBioDataRepository::new();
        for year in [Some(1990), None, Some(1990), Some(1985)] {
            repo.insert(NewBioData {
                image_url: None,
                data: vec![BioField::new("Name", "X")],
                birth_year: year,
                is_male: true,
            })
            .await
            .unwrap();
        }

        let all = repo.list(None).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].id > w[1].id));

        assert_eq!(repo.list(Some(1990)).await.unwrap().len(), 2);
        assert_eq!(repo.distinct_birth_years().await.unwrap(), vec![1985, 1990]);
    }

    #[tokio::test]
    async fn test_blob_store_round_trip_and_failure_injection() {
        let blobs = MemoryBlobStore::new("bucket", "http://localhost:5000");
        let url = blobs.put("a b.png", b"png", "image/png").await.unwrap();
        assert!(url.starts_with("http://localhost:5000/v0/b/bucket/o/"));
        assert!(url.ends_with("?alt=media"));
        assert_eq!(blobs.read(&url).await.unwrap(), b"png");

        blobs.fail_delete_for(&url).await;
        assert!(blobs.delete(&url).await.is_err());
        assert!(blobs.contains(&url).await);

        blobs.fail_put_for("bad.png").await;
        assert!(matches!(
            blobs.put("bad.png", b"x", "image/png").await,
            Err(Error::Storage(_))
        ));
        assert_eq!(blobs.put_count(), 1);
    }

    #[tokio::test]
    async fn test_set_access_on_missing_user() {
        let repo = MemoryUserRepository::new();
        assert!(repo.set_access(Uuid::now_v7(), true).await.unwrap().is_none());

        let user = repo.insert("a@example.com", "g-1").await.unwrap();
        assert!(!user.access);
        let updated = repo.set_access(user.id, true).await.unwrap().unwrap();
        assert!(updated.access);
    }
}
