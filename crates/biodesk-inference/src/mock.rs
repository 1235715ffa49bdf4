//! Mock extraction client for deterministic testing.
//!
//! ```rust,ignore
//! use biodesk_inference::mock::MockExtractionClient;
//!
//! let client = MockExtractionClient::new()
//!     .with_response(r#"{"items":[{"label":"Age","value":"29"}]}"#);
//! let result = extract_bio_data(&client, "Age 29").await.unwrap();
//! assert_eq!(client.call_count(), 1);
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use biodesk_core::{Error, ExtractionClient, ExtractionRequest, Result};

/// Mock extraction client returning a canned response.
#[derive(Clone)]
pub struct MockExtractionClient {
    response: Arc<Mutex<MockResponse>>,
    call_log: Arc<Mutex<Vec<ExtractionRequest>>>,
}

#[derive(Debug, Clone)]
enum MockResponse {
    Text(String),
    Failure(String),
}

impl Default for MockExtractionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExtractionClient {
    /// Create a mock that answers with an empty item list.
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(MockResponse::Text(r#"{"items":[]}"#.to_string()))),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every request with `text`.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.set_response(MockResponse::Text(text.into()));
        self
    }

    /// Fail every request with an upstream error.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.set_response(MockResponse::Failure(message.into()));
        self
    }

    fn set_response(&self, response: MockResponse) {
        let mut slot = self.response.lock().unwrap_or_else(|e| e.into_inner());
        *slot = response;
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<ExtractionRequest> {
        self.call_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ExtractionClient for MockExtractionClient {
    async fn send(&self, request: &ExtractionRequest) -> Result<String> {
        self.call_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let response = self
            .response
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match response {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Failure(message) => Err(Error::Inference(message)),
        }
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}
