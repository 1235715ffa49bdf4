//! Attachment-aware record lifecycle.
//!
//! Records live in the record store, their attachments in the blob store, and
//! the two share no transaction. Every mutation is a short saga with a fixed
//! order:
//!
//! | Operation | Order | Compensation |
//! |-----------|-------|--------------|
//! | create | upload all → insert | failed upload or insert deletes the uploaded blobs |
//! | update | upload new → persist → delete old | failed persist deletes the new blobs |
//! | delete | delete blobs → delete record | none; blob failures are reported |
//!
//! The record never points at a blob that does not exist. When a blob cannot
//! be removed it is left orphaned and reported, never retried.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use biodesk_core::validation::{check_slots, require_attachments, validate_profile_fields};
use biodesk_core::{
    derive_birth_year, validate_image, AttachmentSlot, BioDataInput, BioDataPatch, BioDataRecord,
    BioDataRepository, BlobCleanupFailure, BlobStore, DeleteOutcome, Error, NewBioData, NewProfile,
    ProfileFields, ProfilePatch, ProfileRecord, ProfileRepository, ProfileSummary, Result,
    UpdateOutcome, UploadedFile,
};

const PROFILE: &str = "profile";
const BIODATA: &str = "biodata";

const BIODATA_SLOTS: [AttachmentSlot; 1] = [AttachmentSlot::Image];

/// Coordinates record writes with the blobs each record owns.
#[derive(Clone)]
pub struct RecordLifecycle {
    profiles: Arc<dyn ProfileRepository>,
    biodata: Arc<dyn BioDataRepository>,
    blobs: Arc<dyn BlobStore>,
}

/// Check slots and content of inbound files, stamping the sniffed MIME type.
fn prepare_files(
    allowed: &[AttachmentSlot],
    required: &[AttachmentSlot],
    mut files: Vec<UploadedFile>,
) -> Result<Vec<UploadedFile>> {
    check_slots(allowed, &files)?;
    require_attachments(required, &files)?;
    for file in &mut files {
        file.content_type = validate_image(&file.filename, &file.data)?;
    }
    Ok(files)
}

fn url_for(uploaded: &[(AttachmentSlot, String)], slot: AttachmentSlot) -> Option<String> {
    uploaded
        .iter()
        .find(|(s, _)| *s == slot)
        .map(|(_, url)| url.clone())
}

fn urls_of(uploaded: Vec<(AttachmentSlot, String)>) -> Vec<String> {
    uploaded.into_iter().map(|(_, url)| url).collect()
}

impl RecordLifecycle {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        biodata: Arc<dyn BioDataRepository>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            profiles,
            biodata,
            blobs,
        }
    }

    // =========================================================================
    // BLOB SAGA STEPS
    // =========================================================================

    /// Upload every file concurrently.
    ///
    /// All-or-nothing: if any upload fails, the ones that succeeded are
    /// deleted and the first error is returned.
    async fn upload_all(
        &self,
        kind: &'static str,
        files: &[UploadedFile],
    ) -> Result<Vec<(AttachmentSlot, String)>> {
        let uploads = files.iter().map(|file| async move {
            self.blobs
                .put(&file.filename, &file.data, &file.content_type)
                .await
                .map(|url| (file.slot, url))
        });

        let mut uploaded = Vec::with_capacity(files.len());
        let mut first_error = None;
        for result in join_all(uploads).await {
            match result {
                Ok(done) => uploaded.push(done),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            warn!(
                subsystem = "lifecycle",
                record_kind = kind,
                blob_count = uploaded.len(),
                error = %err,
                "Upload failed, discarding sibling uploads"
            );
            self.discard_blobs(kind, urls_of(uploaded)).await;
            return Err(err);
        }

        debug!(
            subsystem = "lifecycle",
            record_kind = kind,
            blob_count = uploaded.len(),
            "Attachments uploaded"
        );
        Ok(uploaded)
    }

    /// Delete blobs independently; every failure is collected, none aborts.
    async fn delete_blobs(&self, kind: &'static str, urls: Vec<String>) -> Vec<BlobCleanupFailure> {
        let deletions = urls.into_iter().map(|url| async move {
            match self.blobs.delete(&url).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        subsystem = "lifecycle",
                        record_kind = kind,
                        blob_url = %url,
                        error = %e,
                        "Blob delete failed, blob orphaned"
                    );
                    Some(BlobCleanupFailure {
                        url,
                        error: e.to_string(),
                    })
                }
            }
        });
        join_all(deletions).await.into_iter().flatten().collect()
    }

    /// Best-effort removal of blobs that never became part of a record.
    async fn discard_blobs(&self, kind: &'static str, urls: Vec<String>) {
        if urls.is_empty() {
            return;
        }
        let failures = self.delete_blobs(kind, urls).await;
        if !failures.is_empty() {
            warn!(
                subsystem = "lifecycle",
                record_kind = kind,
                blob_count = failures.len(),
                "Compensation left orphaned blobs"
            );
        }
    }

    // =========================================================================
    // PROFILES
    // =========================================================================

    /// Create a profile with both photos.
    pub async fn create_profile(
        &self,
        fields: ProfileFields,
        files: Vec<UploadedFile>,
    ) -> Result<ProfileRecord> {
        let start = Instant::now();
        validate_profile_fields(&fields)?;
        let files = prepare_files(&AttachmentSlot::PROFILE, &AttachmentSlot::PROFILE, files)?;

        let uploaded = self.upload_all(PROFILE, &files).await?;
        let new = NewProfile {
            fields,
            photo1: url_for(&uploaded, AttachmentSlot::Photo1),
            photo2: url_for(&uploaded, AttachmentSlot::Photo2),
        };

        match self.profiles.insert(new).await {
            Ok(record) => {
                info!(
                    subsystem = "lifecycle",
                    op = "create",
                    record_kind = PROFILE,
                    record_id = %record.id,
                    blob_count = uploaded.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Profile created"
                );
                Ok(record)
            }
            Err(e) => {
                self.discard_blobs(PROFILE, urls_of(uploaded)).await;
                Err(e)
            }
        }
    }

    pub async fn get_profile(&self, id: Uuid) -> Result<ProfileRecord> {
        self.profiles
            .fetch(id)
            .await?
            .ok_or_else(|| Error::NotFound("Profile not found".to_string()))
    }

    /// Patch scalar fields and replace any supplied photos.
    ///
    /// A profile holds either both photos or none, so a profile without photos
    /// must receive both at once.
    pub async fn update_profile(
        &self,
        id: Uuid,
        patch: ProfilePatch,
        files: Vec<UploadedFile>,
    ) -> Result<UpdateOutcome<ProfileRecord>> {
        let start = Instant::now();
        let files = prepare_files(&AttachmentSlot::PROFILE, &[], files)?;
        let existing = self.get_profile(id).await?;

        let has_photo = |slot: AttachmentSlot| {
            files.iter().any(|f| f.slot == slot) || existing.slot_url(slot).is_some()
        };
        if has_photo(AttachmentSlot::Photo1) != has_photo(AttachmentSlot::Photo2) {
            return Err(Error::Validation("Both photos are required".to_string()));
        }

        let mut record = existing.clone();
        patch.apply(&mut record.fields);
        validate_profile_fields(&record.fields)?;

        let uploaded = self.upload_all(PROFILE, &files).await?;
        let mut replaced = Vec::new();
        for (slot, url) in &uploaded {
            if let Some(old) = existing.slot_url(*slot) {
                replaced.push(old.to_string());
            }
            record.set_slot_url(*slot, url.clone());
        }

        let saved = match self.profiles.update(&record).await {
            Ok(saved) => saved,
            Err(e) => {
                self.discard_blobs(PROFILE, urls_of(uploaded)).await;
                return Err(e);
            }
        };

        let cleanup_failures = self.delete_blobs(PROFILE, replaced).await;
        info!(
            subsystem = "lifecycle",
            op = "update",
            record_kind = PROFILE,
            record_id = %id,
            blob_count = uploaded.len(),
            orphaned = cleanup_failures.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Profile updated"
        );
        Ok(UpdateOutcome {
            record: saved,
            cleanup_failures,
        })
    }

    /// Delete a profile and its photos.
    pub async fn delete_profile(&self, id: Uuid) -> Result<DeleteOutcome> {
        let existing = self.get_profile(id).await?;
        let blob_failures = self.delete_blobs(PROFILE, existing.attachment_urls()).await;

        if !self.profiles.delete(id).await? {
            return Err(Error::NotFound("Profile not found".to_string()));
        }

        info!(
            subsystem = "lifecycle",
            op = "delete",
            record_kind = PROFILE,
            record_id = %id,
            orphaned = blob_failures.len(),
            "Profile deleted"
        );
        Ok(DeleteOutcome { id, blob_failures })
    }

    pub async fn list_profiles(&self) -> Result<Vec<ProfileSummary>> {
        self.profiles.list_summaries().await
    }

    /// Full profiles, for users who have been granted access.
    pub async fn list_profiles_full(&self) -> Result<Vec<ProfileRecord>> {
        self.profiles.list_all().await
    }

    // =========================================================================
    // BIODATA
    // =========================================================================

    /// Create a biodata record with an optional image.
    pub async fn create_biodata(
        &self,
        input: BioDataInput,
        image: Option<UploadedFile>,
    ) -> Result<BioDataRecord> {
        let files = prepare_files(&BIODATA_SLOTS, &[], image.into_iter().collect())?;
        let birth_year = derive_birth_year(&input.data);

        let uploaded = self.upload_all(BIODATA, &files).await?;
        let new = NewBioData {
            image_url: url_for(&uploaded, AttachmentSlot::Image),
            data: input.data,
            birth_year,
            is_male: input.is_male.unwrap_or(true),
        };

        match self.biodata.insert(new).await {
            Ok(record) => {
                info!(
                    subsystem = "lifecycle",
                    op = "create",
                    record_kind = BIODATA,
                    record_id = %record.id,
                    birth_year = ?record.birth_year,
                    "Biodata created"
                );
                Ok(record)
            }
            Err(e) => {
                self.discard_blobs(BIODATA, urls_of(uploaded)).await;
                Err(e)
            }
        }
    }

    pub async fn get_biodata(&self, id: Uuid) -> Result<BioDataRecord> {
        self.biodata
            .fetch(id)
            .await?
            .ok_or_else(|| Error::NotFound("Biodata not found".to_string()))
    }

    /// Update fields and optionally replace the image.
    ///
    /// `birth_year` is re-derived whenever the field list is replaced.
    pub async fn update_biodata(
        &self,
        id: Uuid,
        patch: BioDataPatch,
        image: Option<UploadedFile>,
    ) -> Result<UpdateOutcome<BioDataRecord>> {
        let files = prepare_files(&BIODATA_SLOTS, &[], image.into_iter().collect())?;
        let existing = self.get_biodata(id).await?;

        let mut record = existing.clone();
        if let Some(data) = patch.data {
            record.birth_year = derive_birth_year(&data);
            record.data = data;
        }
        if let Some(is_male) = patch.is_male {
            record.is_male = is_male;
        }

        let uploaded = self.upload_all(BIODATA, &files).await?;
        let replaced: Vec<String> = match url_for(&uploaded, AttachmentSlot::Image) {
            Some(url) => {
                record.image_url = Some(url);
                existing.image_url.iter().cloned().collect()
            }
            None => Vec::new(),
        };

        let saved = match self.biodata.update(&record).await {
            Ok(saved) => saved,
            Err(e) => {
                self.discard_blobs(BIODATA, urls_of(uploaded)).await;
                return Err(e);
            }
        };

        let cleanup_failures = self.delete_blobs(BIODATA, replaced).await;
        info!(
            subsystem = "lifecycle",
            op = "update",
            record_kind = BIODATA,
            record_id = %id,
            orphaned = cleanup_failures.len(),
            "Biodata updated"
        );
        Ok(UpdateOutcome {
            record: saved,
            cleanup_failures,
        })
    }

    pub async fn delete_biodata(&self, id: Uuid) -> Result<DeleteOutcome> {
        let existing = self.get_biodata(id).await?;
        let blob_failures = self.delete_blobs(BIODATA, existing.attachment_urls()).await;

        if !self.biodata.delete(id).await? {
            return Err(Error::NotFound("Biodata not found".to_string()));
        }

        info!(
            subsystem = "lifecycle",
            op = "delete",
            record_kind = BIODATA,
            record_id = %id,
            orphaned = blob_failures.len(),
            "Biodata deleted"
        );
        Ok(DeleteOutcome { id, blob_failures })
    }

    /// Newest first, optionally only one birth year.
    pub async fn list_biodata(&self, birth_year: Option<i32>) -> Result<Vec<BioDataRecord>> {
        let records = self.biodata.list(birth_year).await?;
        debug!(
            subsystem = "lifecycle",
            record_kind = BIODATA,
            birth_year = ?birth_year,
            result_count = records.len(),
            "Biodata listed"
        );
        Ok(records)
    }

    pub async fn distinct_years(&self) -> Result<Vec<i32>> {
        self.biodata.distinct_birth_years().await
    }
}
