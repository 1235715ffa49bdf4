//! OpenAI-compatible extraction client.
//!
//! Works with any endpoint that implements `/chat/completions` with
//! `response_format: {"type": "json_object"}` (OpenAI, Azure OpenAI, vLLM,
//! LocalAI, Ollama in compatibility mode).
//!
//! # Example
//!
//! ```rust,no_run
//! use biodesk_inference::openai::OpenAIExtractionClient;
//! use biodesk_inference::extract_bio_data;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = OpenAIExtractionClient::from_env().unwrap();
//!     let result = extract_bio_data(&client, "Name: Asha\nDOB: 14 March 1994")
//!         .await
//!         .unwrap();
//!     println!("{:?}", result.items);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIConfig, OpenAIExtractionClient, DEFAULT_OPENAI_URL, DEFAULT_TIMEOUT_SECS};
pub use error::{to_biodesk_error, OpenAIErrorCode};
pub use types::*;
