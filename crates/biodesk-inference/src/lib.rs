//! # biodesk-inference
//!
//! Extraction service client and output normalization for biodesk.
//!
//! This crate provides:
//! - The pure request builder and normalizer for biodata extraction
//! - An OpenAI-compatible [`ExtractionClient`] (feature `openai`, default)
//! - A mock client for tests (feature `mock`)

pub mod extraction;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use biodesk_core::*;

pub use extraction::{
    build_extraction_request, extract_bio_data, normalize_extraction, EXTRACTION_MODEL,
    EXTRACTION_SYSTEM_PROMPT, EXTRACTION_TEMPERATURE, EXTRACTION_USER_PREFIX,
};

#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIExtractionClient};
