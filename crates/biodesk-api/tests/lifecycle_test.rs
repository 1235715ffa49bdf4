//! Record lifecycle sagas against the in-memory record and blob stores.
//!
//! Failure injection on the stores drives every compensation path: failed
//! uploads, failed record writes, and blob deletes that leave orphans.

use std::sync::Arc;

use biodesk_api::RecordLifecycle;
use biodesk_core::{
    AttachmentSlot, BioDataInput, BioDataPatch, BioField, Error, ProfileFields, ProfilePatch,
    UploadedFile,
};
use biodesk_db::{MemoryBioDataRepository, MemoryBlobStore, MemoryProfileRepository};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

struct Harness {
    profiles: Arc<MemoryProfileRepository>,
    biodata: Arc<MemoryBioDataRepository>,
    blobs: Arc<MemoryBlobStore>,
    lifecycle: RecordLifecycle,
}

fn harness() -> Harness {
    let profiles = Arc::new(MemoryProfileRepository::new());
    let biodata = Arc::new(MemoryBioDataRepository::new());
    let blobs = Arc::new(MemoryBlobStore::new("biodesk", "http://localhost:5000"));
    let lifecycle = RecordLifecycle::new(profiles.clone(), biodata.clone(), blobs.clone());
    Harness {
        profiles,
        biodata,
        blobs,
        lifecycle,
    }
}

fn fields(mobile: &str) -> ProfileFields {
    ProfileFields {
        full_name: "Asha Rao".to_string(),
        father_name: "Ravi Rao".to_string(),
        mother_name: "Lata Rao".to_string(),
        mobile: mobile.to_string(),
        age: 29,
        occupation: "Engineer".to_string(),
        experience: "5 years".to_string(),
        salary: "12 LPA".to_string(),
        current_address: "Pune".to_string(),
        permanent_address: "Nagpur".to_string(),
        height: "5'4\"".to_string(),
        message: None,
    }
}

fn upload(slot: AttachmentSlot, filename: &str) -> UploadedFile {
    UploadedFile {
        slot,
        filename: filename.to_string(),
        content_type: "image/png".to_string(),
        data: PNG.to_vec(),
    }
}

fn both_photos() -> Vec<UploadedFile> {
    vec![
        upload(AttachmentSlot::Photo1, "a.png"),
        upload(AttachmentSlot::Photo2, "b.png"),
    ]
}

fn bio(pairs: &[(&str, &str)]) -> Vec<BioField> {
    pairs.iter().map(|(l, v)| BioField::new(*l, *v)).collect()
}

// =============================================================================
// PROFILE CREATE
// =============================================================================

#[tokio::test]
async fn test_create_profile_uploads_one_blob_per_photo() {
    let h = harness();
    let profile = h
        .lifecycle
        .create_profile(fields("9000000001"), both_photos())
        .await
        .unwrap();

    assert_eq!(h.blobs.put_count(), 2);
    let photo1 = profile.photo1.clone().unwrap();
    let photo2 = profile.photo2.clone().unwrap();
    assert_ne!(photo1, photo2);
    assert!(h.blobs.contains(&photo1).await);
    assert!(h.blobs.contains(&photo2).await);

    let stored = h.lifecycle.get_profile(profile.id).await.unwrap();
    assert_eq!(stored, profile);
}

#[tokio::test]
async fn test_create_profile_with_one_photo_does_no_io() {
    let h = harness();
    let err = h
        .lifecycle
        .create_profile(
            fields("9000000002"),
            vec![upload(AttachmentSlot::Photo1, "a.png")],
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Both photos are required");
    assert_eq!(h.blobs.put_count(), 0);
    assert!(h.profiles.is_empty().await);
}

#[tokio::test]
async fn test_create_profile_rejects_non_image_before_upload() {
    let h = harness();
    let mut files = both_photos();
    files[1].data = b"%PDF-1.4 not a photo".to_vec();

    let err = h
        .lifecycle
        .create_profile(fields("9000000003"), files)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(h.blobs.put_count(), 0);
}

#[tokio::test]
async fn test_failed_upload_discards_sibling_and_writes_nothing() {
    let h = harness();
    h.blobs.fail_put_for("b.png").await;

    let err = h
        .lifecycle
        .create_profile(fields("9000000004"), both_photos())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    assert!(h.blobs.is_empty().await);
    assert!(h.profiles.is_empty().await);
}

#[tokio::test]
async fn test_failed_record_write_discards_uploads() {
    let h = harness();
    h.profiles.set_fail_writes(true);

    let err = h
        .lifecycle
        .create_profile(fields("9000000005"), both_photos())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Internal(_)));
    assert_eq!(h.blobs.put_count(), 2);
    assert!(h.blobs.is_empty().await);
}

#[tokio::test]
async fn test_duplicate_mobile_is_conflict_without_orphans() {
    let h = harness();
    h.lifecycle
        .create_profile(fields("9000000006"), both_photos())
        .await
        .unwrap();

    let err = h
        .lifecycle
        .create_profile(fields("9000000006"), both_photos())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(h.blobs.len().await, 2);
    assert_eq!(h.profiles.len().await, 1);
}

// =============================================================================
// PROFILE UPDATE
// =============================================================================

#[tokio::test]
async fn test_update_replaces_photo_then_deletes_old() {
    let h = harness();
    let profile = h
        .lifecycle
        .create_profile(fields("9000000007"), both_photos())
        .await
        .unwrap();
    let old_photo1 = profile.photo1.clone().unwrap();

    let outcome = h
        .lifecycle
        .update_profile(
            profile.id,
            ProfilePatch {
                occupation: Some("Architect".to_string()),
                ..Default::default()
            },
            vec![upload(AttachmentSlot::Photo1, "new.png")],
        )
        .await
        .unwrap();

    let updated = outcome.record;
    let new_photo1 = updated.photo1.clone().unwrap();
    assert_ne!(new_photo1, old_photo1);
    assert!(h.blobs.contains(&new_photo1).await);
    assert!(!h.blobs.contains(&old_photo1).await);
    assert_eq!(updated.photo2, profile.photo2);
    assert_eq!(updated.fields.occupation, "Architect");
    assert!(outcome.cleanup_failures.is_empty());
    assert_eq!(h.blobs.len().await, 2);
}

#[tokio::test]
async fn test_update_keeps_new_url_when_old_blob_delete_fails() {
    let h = harness();
    let profile = h
        .lifecycle
        .create_profile(fields("9000000008"), both_photos())
        .await
        .unwrap();
    let old_photo2 = profile.photo2.clone().unwrap();
    h.blobs.fail_delete_for(&old_photo2).await;

    let outcome = h
        .lifecycle
        .update_profile(
            profile.id,
            ProfilePatch::default(),
            vec![upload(AttachmentSlot::Photo2, "c.png")],
        )
        .await
        .unwrap();

    assert_eq!(outcome.cleanup_failures.len(), 1);
    assert_eq!(outcome.cleanup_failures[0].url, old_photo2);

    let new_photo2 = outcome.record.photo2.clone().unwrap();
    assert_ne!(new_photo2, old_photo2);
    assert!(h.blobs.contains(&new_photo2).await);
    // The old blob is orphaned, the record points at the new one.
    assert!(h.blobs.contains(&old_photo2).await);
    let stored = h.lifecycle.get_profile(profile.id).await.unwrap();
    assert_eq!(stored.photo2.as_deref(), Some(new_photo2.as_str()));
}

#[tokio::test]
async fn test_failed_persist_discards_new_blobs_and_keeps_old() {
    let h = harness();
    let profile = h
        .lifecycle
        .create_profile(fields("9000000009"), both_photos())
        .await
        .unwrap();
    h.profiles.set_fail_writes(true);

    let err = h
        .lifecycle
        .update_profile(
            profile.id,
            ProfilePatch::default(),
            vec![
                upload(AttachmentSlot::Photo1, "x.png"),
                upload(AttachmentSlot::Photo2, "y.png"),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Internal(_)));
    assert_eq!(h.blobs.len().await, 2);
    for url in profile.attachment_urls() {
        assert!(h.blobs.contains(&url).await);
    }
    assert_eq!(h.lifecycle.get_profile(profile.id).await.unwrap(), profile);
}

#[tokio::test]
async fn test_update_unknown_profile_is_not_found_without_uploads() {
    let h = harness();
    let err = h
        .lifecycle
        .update_profile(
            uuid::Uuid::now_v7(),
            ProfilePatch::default(),
            vec![upload(AttachmentSlot::Photo1, "a.png")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(h.blobs.put_count(), 0);
}

// =============================================================================
// PROFILE DELETE
// =============================================================================

#[tokio::test]
async fn test_delete_removes_record_even_when_a_blob_delete_fails() {
    let h = harness();
    let profile = h
        .lifecycle
        .create_profile(fields("9000000010"), both_photos())
        .await
        .unwrap();
    let photo1 = profile.photo1.clone().unwrap();
    let photo2 = profile.photo2.clone().unwrap();
    h.blobs.fail_delete_for(&photo1).await;

    let outcome = h.lifecycle.delete_profile(profile.id).await.unwrap();

    assert_eq!(outcome.id, profile.id);
    assert!(outcome.is_partial());
    assert_eq!(outcome.blob_failures.len(), 1);
    assert_eq!(outcome.blob_failures[0].url, photo1);
    assert!(!h.blobs.contains(&photo2).await);
    assert!(matches!(
        h.lifecycle.get_profile(profile.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_twice_is_not_found_the_second_time() {
    let h = harness();
    let profile = h
        .lifecycle
        .create_profile(fields("9000000011"), both_photos())
        .await
        .unwrap();

    let first = h.lifecycle.delete_profile(profile.id).await.unwrap();
    assert!(!first.is_partial());
    assert!(h.blobs.is_empty().await);

    let second = h.lifecycle.delete_profile(profile.id).await;
    assert!(matches!(second, Err(Error::NotFound(_))));
    assert_eq!(h.blobs.delete_count(), 2);
}

#[tokio::test]
async fn test_list_profiles_is_reduced_projection() {
    let h = harness();
    h.lifecycle
        .create_profile(fields("9000000012"), both_photos())
        .await
        .unwrap();

    let summaries = h.lifecycle.list_profiles().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].full_name, "Asha Rao");
    assert_eq!(h.lifecycle.list_profiles_full().await.unwrap().len(), 1);
}

// =============================================================================
// BIODATA
// =============================================================================

#[tokio::test]
async fn test_create_biodata_derives_year_and_defaults_gender() {
    let h = harness();
    let record = h
        .lifecycle
        .create_biodata(
            BioDataInput {
                data: bio(&[("Name", "Asha"), ("Date of Birth", "14 March 1994")]),
                is_male: None,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(record.birth_year, Some(1994));
    assert!(record.is_male);
    assert_eq!(record.image_url, None);
    assert_eq!(h.blobs.put_count(), 0);
}

#[tokio::test]
async fn test_biodata_update_rederives_year_and_replaces_image() {
    let h = harness();
    let record = h
        .lifecycle
        .create_biodata(
            BioDataInput {
                data: bio(&[("DOB", "1990-01-02")]),
                is_male: Some(false),
            },
            Some(upload(AttachmentSlot::Image, "face.png")),
        )
        .await
        .unwrap();
    let old_image = record.image_url.clone().unwrap();

    let outcome = h
        .lifecycle
        .update_biodata(
            record.id,
            BioDataPatch {
                data: Some(bio(&[("Name", "Meera"), ("dob", "March 94")])),
                is_male: None,
            },
            Some(upload(AttachmentSlot::Image, "face2.png")),
        )
        .await
        .unwrap();

    let updated = outcome.record;
    assert_eq!(updated.birth_year, None);
    assert!(!updated.is_male);
    assert_ne!(updated.image_url.as_deref(), Some(old_image.as_str()));
    assert!(!h.blobs.contains(&old_image).await);
    assert_eq!(h.blobs.len().await, 1);
}

#[tokio::test]
async fn test_biodata_update_without_data_keeps_year() {
    let h = harness();
    let record = h
        .lifecycle
        .create_biodata(
            BioDataInput {
                data: bio(&[("Date of birth", "1988")]),
                is_male: None,
            },
            None,
        )
        .await
        .unwrap();

    let outcome = h
        .lifecycle
        .update_biodata(
            record.id,
            BioDataPatch {
                data: None,
                is_male: Some(false),
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.record.birth_year, Some(1988));
    assert!(!outcome.record.is_male);
}

#[tokio::test]
async fn test_distinct_years_are_sorted_and_skip_null() {
    let h = harness();
    for value in [Some("1990"), None, Some("1994"), Some("1990")] {
        let data = match value {
            Some(year) => bio(&[("DOB", year)]),
            None => bio(&[("Name", "No date")]),
        };
        h.lifecycle
            .create_biodata(BioDataInput { data, is_male: None }, None)
            .await
            .unwrap();
    }

    assert_eq!(h.lifecycle.distinct_years().await.unwrap(), vec![1990, 1994]);
    assert_eq!(h.lifecycle.list_biodata(Some(1990)).await.unwrap().len(), 2);
    assert_eq!(h.lifecycle.list_biodata(None).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_biodata_delete_removes_image() {
    let h = harness();
    let record = h
        .lifecycle
        .create_biodata(
            BioDataInput {
                data: bio(&[("Name", "Asha")]),
                is_male: None,
            },
            Some(upload(AttachmentSlot::Image, "face.png")),
        )
        .await
        .unwrap();

    let outcome = h.lifecycle.delete_biodata(record.id).await.unwrap();
    assert!(outcome.blob_failures.is_empty());
    assert!(h.blobs.is_empty().await);
    assert!(h.biodata.is_empty().await);
    assert!(matches!(
        h.lifecycle.delete_biodata(record.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_biodata_write_failure_discards_image() {
    let h = harness();
    h.biodata.set_fail_writes(true);

    let result = h
        .lifecycle
        .create_biodata(
            BioDataInput {
                data: bio(&[("Name", "Asha")]),
                is_male: None,
            },
            Some(upload(AttachmentSlot::Image, "face.png")),
        )
        .await;

    assert!(result.is_err());
    assert!(h.blobs.is_empty().await);
}
