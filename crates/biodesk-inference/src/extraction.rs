//! Extraction request construction and output normalization.
//!
//! The completion service is an untrusted black box: it is asked for
//! `{"items":[{"label":"...","value":"..."}]}` but may answer with anything.
//! [`normalize_extraction`] is total over its input and never fails; output
//! it cannot interpret becomes a degraded result carrying the raw text.

use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use biodesk_core::{
    ChatMessage, Error, ExtractionClient, ExtractionItem, ExtractionRequest, ExtractionResult,
    ResponseFormat, Result,
};

/// Model used for every extraction request.
pub const EXTRACTION_MODEL: &str = "gpt-4o-mini";

/// Low temperature biases the model toward deterministic output.
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// System instruction describing the required output shape.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You extract biodata from free-form text. \
Respond with a single JSON object of exactly this shape and nothing else: \
{\"items\":[{\"label\":\"...\",\"value\":\"...\"}]}. \
Each item is one field found in the text, such as Name, Date of Birth, Height, \
Education, Occupation, Father's Name or Address. Use the field name as the label \
and the text as written as the value. Both label and value must be strings. \
Keep the order in which fields appear. Do not invent fields that are not present.";

/// Fixed instruction prepended to the caller's text.
pub const EXTRACTION_USER_PREFIX: &str = "Extract the biodata fields from the following text:\n\n";

/// Build the outbound extraction request for `text`.
pub fn build_extraction_request(text: &str) -> ExtractionRequest {
    ExtractionRequest {
        model: EXTRACTION_MODEL.to_string(),
        temperature: EXTRACTION_TEMPERATURE,
        response_format: ResponseFormat {
            kind: "json_object".to_string(),
        },
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: EXTRACTION_SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: format!("{}{}", EXTRACTION_USER_PREFIX, text),
            },
        ],
    }
}

/// Parse raw completion text into an [`ExtractionResult`].
///
/// Tolerates surrounding whitespace, one Markdown code fence, scalar
/// non-string values, and items with missing values. Items without a string
/// label are dropped. Anything that is not an object with an `items` array
/// yields `{items: [], raw}`.
pub fn normalize_extraction(raw: &str) -> ExtractionResult {
    let body = strip_code_fence(raw.trim());

    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return ExtractionResult::degraded(raw),
    };

    match parsed.get("items").and_then(Value::as_array) {
        Some(items) => ExtractionResult::parsed(items.iter().filter_map(item_from_value).collect()),
        None => ExtractionResult::degraded(raw),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };
    // Opening fence line may carry a language tag
    match inner.find('\n') {
        Some(newline) => inner[newline + 1..].trim(),
        None => inner.trim(),
    }
}

fn item_from_value(item: &Value) -> Option<ExtractionItem> {
    let label = item.get("label")?.as_str()?;
    if label.trim().is_empty() {
        return None;
    }
    let value = match item.get("value") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Some(ExtractionItem {
        label: label.to_string(),
        value,
    })
}

/// Run one extraction: validate input, call the service, normalize.
///
/// Transport and upstream failures are returned as errors; unparseable
/// output is not an error and comes back degraded.
pub async fn extract_bio_data(
    client: &dyn ExtractionClient,
    text: &str,
) -> Result<ExtractionResult> {
    if text.trim().is_empty() {
        return Err(Error::Validation("Text is required".to_string()));
    }

    let start = Instant::now();
    let request = build_extraction_request(text);
    let raw = client.send(&request).await?;
    let result = normalize_extraction(&raw);

    if result.is_degraded() {
        warn!(
            subsystem = "inference",
            op = "extract",
            model = %request.model,
            backend = client.backend_name(),
            response_len = raw.len(),
            "Extraction output unparseable, returning raw text"
        );
    } else {
        info!(
            subsystem = "inference",
            op = "extract",
            model = %request.model,
            backend = client.backend_name(),
            result_count = result.items.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Extraction completed"
        );
    }
    Ok(result)
}
