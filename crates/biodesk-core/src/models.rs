//! Data model for biodesk records, attachments, and extraction results.
//!
//! Wire names are camelCase (`fullName`, `imageUrl`, `birthYear`) to keep the
//! JSON contract stable for existing clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// =============================================================================
// PROFILE RECORDS
// =============================================================================

/// Required scalar fields of a profile plus the optional free-text message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub full_name: String,
    pub father_name: String,
    pub mother_name: String,
    pub mobile: String,
    pub age: i32,
    pub occupation: String,
    pub experience: String,
    pub salary: String,
    pub current_address: String,
    pub permanent_address: String,
    pub height: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A persisted profile. `photo1`/`photo2` are either both set or both absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: ProfileFields,
    pub photo1: Option<String>,
    pub photo2: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// URLs of every blob this record currently owns.
    pub fn attachment_urls(&self) -> Vec<String> {
        [&self.photo1, &self.photo2]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// URL currently held in the given slot, if any.
    pub fn slot_url(&self, slot: AttachmentSlot) -> Option<&str> {
        match slot {
            AttachmentSlot::Photo1 => self.photo1.as_deref(),
            AttachmentSlot::Photo2 => self.photo2.as_deref(),
            AttachmentSlot::Image => None,
        }
    }

    /// Point a slot at a new URL.
    pub fn set_slot_url(&mut self, slot: AttachmentSlot, url: String) {
        match slot {
            AttachmentSlot::Photo1 => self.photo1 = Some(url),
            AttachmentSlot::Photo2 => self.photo2 = Some(url),
            AttachmentSlot::Image => {}
        }
    }
}

/// Input for inserting a profile into the record store.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub fields: ProfileFields,
    pub photo1: Option<String>,
    pub photo2: Option<String>,
}

/// Partial update of profile scalar fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub father_name: Option<String>,
    pub mother_name: Option<String>,
    pub mobile: Option<String>,
    pub age: Option<i32>,
    pub occupation: Option<String>,
    pub experience: Option<String>,
    pub salary: Option<String>,
    pub current_address: Option<String>,
    pub permanent_address: Option<String>,
    pub height: Option<String>,
    pub message: Option<String>,
}

impl ProfilePatch {
    /// Apply the patch onto stored fields.
    pub fn apply(self, fields: &mut ProfileFields) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        set(&mut fields.full_name, self.full_name);
        set(&mut fields.father_name, self.father_name);
        set(&mut fields.mother_name, self.mother_name);
        set(&mut fields.mobile, self.mobile);
        set(&mut fields.age, self.age);
        set(&mut fields.occupation, self.occupation);
        set(&mut fields.experience, self.experience);
        set(&mut fields.salary, self.salary);
        set(&mut fields.current_address, self.current_address);
        set(&mut fields.permanent_address, self.permanent_address);
        set(&mut fields.height, self.height);
        if let Some(message) = self.message {
            fields.message = Some(message);
        }
    }
}

/// Reduced projection returned by profile listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: Uuid,
    pub full_name: String,
    pub age: i32,
    pub occupation: String,
    pub current_address: String,
}

impl From<&ProfileRecord> for ProfileSummary {
    fn from(p: &ProfileRecord) -> Self {
        Self {
            id: p.id,
            full_name: p.fields.full_name.clone(),
            age: p.fields.age,
            occupation: p.fields.occupation.clone(),
            current_address: p.fields.current_address.clone(),
        }
    }
}

// =============================================================================
// BIODATA RECORDS
// =============================================================================

/// One dynamic `(label, value)` pair. Order within a record is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BioField {
    pub label: String,
    pub value: String,
}

impl BioField {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A persisted biodata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BioDataRecord {
    pub id: Uuid,
    pub image_url: Option<String>,
    pub data: Vec<BioField>,
    pub birth_year: Option<i32>,
    pub is_male: bool,
    pub created_at: DateTime<Utc>,
}

impl BioDataRecord {
    pub fn attachment_urls(&self) -> Vec<String> {
        self.image_url.iter().cloned().collect()
    }
}

/// Input for inserting a biodata record. `birth_year` must already be derived.
#[derive(Debug, Clone)]
pub struct NewBioData {
    pub image_url: Option<String>,
    pub data: Vec<BioField>,
    pub birth_year: Option<i32>,
    pub is_male: bool,
}

/// Caller-supplied biodata content for create.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BioDataInput {
    #[serde(default)]
    pub data: Vec<BioField>,
    /// Defaults to `true` when omitted.
    pub is_male: Option<bool>,
}

/// Partial update of a biodata record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BioDataPatch {
    pub data: Option<Vec<BioField>>,
    pub is_male: Option<bool>,
}

// =============================================================================
// USERS AND ADMINS
// =============================================================================

/// An end user linked to an external identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub google_id: String,
    pub access: bool,
    pub payment: bool,
    pub created_at: DateTime<Utc>,
}

/// An administrator allowed to grant profile access to users.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    pub id: Uuid,
    pub admin_name: String,
    /// Argon2id PHC string of the password.
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Identity extracted from a verified request token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPrincipal {
    /// Identity-provider subject (stored as the user's `googleId`).
    pub id: String,
    pub email: String,
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Named position of an attachment on a record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    Photo1,
    Photo2,
    Image,
}

impl AttachmentSlot {
    pub const PROFILE: [AttachmentSlot; 2] = [AttachmentSlot::Photo1, AttachmentSlot::Photo2];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentSlot::Photo1 => "photo1",
            AttachmentSlot::Photo2 => "photo2",
            AttachmentSlot::Image => "image",
        }
    }

    /// Parse a multipart field name.
    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "photo1" => Some(AttachmentSlot::Photo1),
            "photo2" => Some(AttachmentSlot::Photo2),
            "image" => Some(AttachmentSlot::Image),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound file destined for the blob store.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub slot: AttachmentSlot,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A blob that could not be removed during cleanup. The blob is orphaned.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BlobCleanupFailure {
    pub url: String,
    pub error: String,
}

/// Result of a delete: the record is gone, some blobs may be orphaned.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub id: Uuid,
    pub blob_failures: Vec<BlobCleanupFailure>,
}

impl DeleteOutcome {
    pub fn is_partial(&self) -> bool {
        !self.blob_failures.is_empty()
    }
}

/// Result of an update: the persisted record plus any old blobs left behind.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome<T> {
    pub record: T,
    pub cleanup_failures: Vec<BlobCleanupFailure>,
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Canonical normalized extraction unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExtractionItem {
    pub label: String,
    pub value: String,
}

impl From<ExtractionItem> for BioField {
    fn from(item: ExtractionItem) -> Self {
        BioField {
            label: item.label,
            value: item.value,
        }
    }
}

/// Normalized extraction output.
///
/// An empty `items` with `raw` set is a degraded result: the upstream text
/// could not be parsed and is returned for manual review. It does not mean
/// "no data found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExtractionResult {
    pub items: Vec<ExtractionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ExtractionResult {
    pub fn parsed(items: Vec<ExtractionItem>) -> Self {
        Self { items, raw: None }
    }

    pub fn degraded(raw: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            raw: Some(raw.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.raw.is_some()
    }
}

/// A single chat message in an extraction request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Constrains the completion output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Outbound contract to the extraction API (chat-completion shaped).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionRequest {
    pub model: String,
    pub temperature: f32,
    pub response_format: ResponseFormat,
    pub messages: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> ProfileFields {
        ProfileFields {
            full_name: "Asha Rao".to_string(),
            father_name: "Ravi Rao".to_string(),
            mother_name: "Lata Rao".to_string(),
            mobile: "9876543210".to_string(),
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

    #[test]
    fn test_profile_serializes_flat_camel_case() {
        let profile = ProfileRecord {
            id: Uuid::nil(),
            fields: sample_fields(),
            photo1: Some("https://x/o/a?alt=media".to_string()),
            photo2: Some("https://x/o/b?alt=media".to_string()),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["fullName"], "Asha Rao");
        assert_eq!(json["currentAddress"], "Pune");
        assert_eq!(json["photo1"], "https://x/o/a?alt=media");
        assert!(json.get("message").is_none());
        assert!(json.get("fields").is_none());
    }

    #[test]
    fn test_profile_attachment_urls_and_slots() {
        let mut profile = ProfileRecord {
            id: Uuid::nil(),
            fields: sample_fields(),
            photo1: Some("a".to_string()),
            photo2: Some("b".to_string()),
            created_at: Utc::now(),
        };
        assert_eq!(profile.attachment_urls(), vec!["a", "b"]);
        assert_eq!(profile.slot_url(AttachmentSlot::Photo2), Some("b"));

        profile.set_slot_url(AttachmentSlot::Photo2, "c".to_string());
        assert_eq!(profile.photo2.as_deref(), Some("c"));
        assert_eq!(profile.slot_url(AttachmentSlot::Image), None);
    }

    #[test]
    fn test_profile_patch_applies_only_present_fields() {
        let mut fields = sample_fields();
        ProfilePatch {
            occupation: Some("Architect".to_string()),
            age: Some(30),
            message: Some("hello".to_string()),
            ..Default::default()
        }
        .apply(&mut fields);

        assert_eq!(fields.occupation, "Architect");
        assert_eq!(fields.age, 30);
        assert_eq!(fields.message.as_deref(), Some("hello"));
        assert_eq!(fields.full_name, "Asha Rao");
    }

    #[test]
    fn test_profile_summary_projection() {
        let profile = ProfileRecord {
            id: Uuid::nil(),
            fields: sample_fields(),
            photo1: None,
            photo2: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(ProfileSummary::from(&profile)).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 5);
        assert!(json.get("mobile").is_none());
        assert!(json.get("photo1").is_none());
    }

    #[test]
    fn test_admin_password_is_never_serialized() {
        let admin = AdminRecord {
            id: Uuid::nil(),
            admin_name: "root".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        };
        let json = serde_json::to_string(&admin).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("adminName"));
    }

    #[test]
    fn test_degraded_extraction_shape() {
        let ok = serde_json::to_value(ExtractionResult::parsed(vec![])).unwrap();
        assert_eq!(ok, serde_json::json!({"items": []}));

        let degraded = ExtractionResult::degraded("not json");
        assert!(degraded.is_degraded());
        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json, serde_json::json!({"items": [], "raw": "not json"}));
    }

    #[test]
    fn test_extraction_request_wire_shape() {
        let req = ExtractionRequest {
            model: "m".to_string(),
            temperature: 0.5,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_slot_field_names() {
        for slot in [
            AttachmentSlot::Photo1,
            AttachmentSlot::Photo2,
            AttachmentSlot::Image,
        ] {
            assert_eq!(AttachmentSlot::from_field_name(slot.as_str()), Some(slot));
        }
        assert_eq!(AttachmentSlot::from_field_name("photo3"), None);
    }
}
