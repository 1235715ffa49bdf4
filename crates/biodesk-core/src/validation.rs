//! Payload validation shared by the HTTP layer and the lifecycle coordinator.
//!
//! All checks here run before any external I/O. A failure is always
//! `Error::Validation` with a single human-readable message.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::{AttachmentSlot, BioField, ProfileFields, ProfilePatch, UploadedFile};

/// Text fields of a multipart form, keyed by field name.
pub type FormFields = BTreeMap<String, String>;

/// Wire names of the required profile fields, in form order.
pub const PROFILE_REQUIRED_FIELDS: [&str; 11] = [
    "fullName",
    "fatherName",
    "motherName",
    "mobile",
    "age",
    "occupation",
    "experience",
    "salary",
    "currentAddress",
    "permanentAddress",
    "height",
];

/// Upper bound accepted for `age`.
pub const MAX_AGE: i32 = 150;

fn present<'a>(form: &'a FormFields, name: &str) -> Option<&'a str> {
    form.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Parse an age value.
pub fn parse_age(raw: &str) -> Result<i32> {
    match raw.trim().parse::<i32>() {
        Ok(age) if (1..=MAX_AGE).contains(&age) => Ok(age),
        _ => Err(Error::Validation(
            "age must be a whole number between 1 and 150".to_string(),
        )),
    }
}

/// Parse a boolean form value ("true"/"false"/"1"/"0").
pub fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::Validation(format!("{} must be true or false", name))),
    }
}

/// Build profile fields from a form, requiring every scalar to be non-empty.
pub fn profile_fields_from_form(form: &FormFields) -> Result<ProfileFields> {
    let missing: Vec<&str> = PROFILE_REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| present(form, name).is_none())
        .collect();

    if !missing.is_empty() {
        return Err(Error::Validation(format!(
            "All fields are required (missing: {})",
            missing.join(", ")
        )));
    }

    // Every required field is present past this point.
    let get = |name: &str| present(form, name).unwrap_or_default().to_string();

    Ok(ProfileFields {
        full_name: get("fullName"),
        father_name: get("fatherName"),
        mother_name: get("motherName"),
        mobile: get("mobile"),
        age: parse_age(&get("age"))?,
        occupation: get("occupation"),
        experience: get("experience"),
        salary: get("salary"),
        current_address: get("currentAddress"),
        permanent_address: get("permanentAddress"),
        height: get("height"),
        message: present(form, "message").map(str::to_string),
    })
}

/// Check typed profile fields: every scalar non-blank, age in range.
pub fn validate_profile_fields(fields: &ProfileFields) -> Result<()> {
    let scalars = [
        ("fullName", &fields.full_name),
        ("fatherName", &fields.father_name),
        ("motherName", &fields.mother_name),
        ("mobile", &fields.mobile),
        ("occupation", &fields.occupation),
        ("experience", &fields.experience),
        ("salary", &fields.salary),
        ("currentAddress", &fields.current_address),
        ("permanentAddress", &fields.permanent_address),
        ("height", &fields.height),
    ];
    let blank: Vec<&str> = scalars
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if !blank.is_empty() {
        return Err(Error::Validation(format!(
            "All fields are required (missing: {})",
            blank.join(", ")
        )));
    }
    if !(1..=MAX_AGE).contains(&fields.age) {
        return Err(Error::Validation(
            "age must be a whole number between 1 and 150".to_string(),
        ));
    }
    Ok(())
}

/// Build a partial profile update. Fields that are sent must be non-empty.
pub fn profile_patch_from_form(form: &FormFields) -> Result<ProfilePatch> {
    let blank: Vec<&str> = PROFILE_REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| form.contains_key(*name) && present(form, name).is_none())
        .collect();

    if !blank.is_empty() {
        return Err(Error::Validation(format!(
            "Fields cannot be empty: {}",
            blank.join(", ")
        )));
    }

    let get = |name: &str| present(form, name).map(str::to_string);

    Ok(ProfilePatch {
        full_name: get("fullName"),
        father_name: get("fatherName"),
        mother_name: get("motherName"),
        mobile: get("mobile"),
        age: get("age").map(|a| parse_age(&a)).transpose()?,
        occupation: get("occupation"),
        experience: get("experience"),
        salary: get("salary"),
        current_address: get("currentAddress"),
        permanent_address: get("permanentAddress"),
        height: get("height"),
        message: get("message"),
    })
}

/// Require one file for every slot in `required`.
pub fn require_attachments(required: &[AttachmentSlot], files: &[UploadedFile]) -> Result<()> {
    let missing = required
        .iter()
        .filter(|slot| !files.iter().any(|f| f.slot == **slot))
        .count();

    match (missing, required.len()) {
        (0, _) => Ok(()),
        (_, 2) => Err(Error::Validation("Both photos are required".to_string())),
        (_, _) => Err(Error::Validation(format!(
            "{} attachment(s) required, {} missing",
            required.len(),
            missing
        ))),
    }
}

/// Reject files whose slot is not accepted by the record kind, and duplicates.
pub fn check_slots(allowed: &[AttachmentSlot], files: &[UploadedFile]) -> Result<()> {
    for (i, file) in files.iter().enumerate() {
        if !allowed.contains(&file.slot) {
            return Err(Error::Validation(format!(
                "Unexpected attachment field: {}",
                file.slot
            )));
        }
        if files[..i].iter().any(|f| f.slot == file.slot) {
            return Err(Error::Validation(format!(
                "Only one file allowed for {}",
                file.slot
            )));
        }
    }
    Ok(())
}

/// Parse the JSON-encoded dynamic field list of a biodata form.
pub fn bio_fields_from_json(raw: &str) -> Result<Vec<BioField>> {
    serde_json::from_str::<Vec<BioField>>(raw).map_err(|e| {
        Error::Validation(format!(
            "data must be a JSON array of {{label, value}} objects: {}",
            e
        ))
    })
}
