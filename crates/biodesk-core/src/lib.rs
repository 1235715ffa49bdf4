//! # biodesk-core
//!
//! Core types, traits, and abstractions for biodesk.
//!
//! This crate provides the data model for profile and biodata records, the
//! shared error taxonomy, and the trait seams behind which the record store,
//! the blob store, and the extraction service are plugged in.

pub mod birth_year;
pub mod error;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use birth_year::derive_birth_year;
pub use error::{Error, Result};
pub use file_safety::{detect_content_type, sanitize_filename, validate_image};
pub use models::*;
pub use traits::*;
