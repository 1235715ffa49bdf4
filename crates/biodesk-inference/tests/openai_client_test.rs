//! OpenAI-compatible extraction client against a mock HTTP server.

#![cfg(feature = "openai")]

use biodesk_core::{Error, ExtractionClient};
use biodesk_inference::openai::{OpenAIConfig, OpenAIExtractionClient};
use biodesk_inference::{build_extraction_request, extract_bio_data};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAIExtractionClient {
    OpenAIExtractionClient::new(OpenAIConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        timeout_seconds: 10,
    })
    .expect("Failed to create client")
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 20, "completion_tokens": 10, "total_tokens": 30}
    })
}

#[tokio::test]
async fn test_request_carries_contract_and_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"items":[{"label":"Age","value":"29"}]}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let raw = client
        .send(&build_extraction_request("Age: 29"))
        .await
        .unwrap();
    assert_eq!(raw, r#"{"items":[{"label":"Age","value":"29"}]}"#);
}

#[tokio::test]
async fn test_end_to_end_extraction() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"items":[{"label":"Name","value":"Asha"},{"label":"Date of Birth","value":"14 March 1994"}]}"#,
        )))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = extract_bio_data(&client, "Asha, born 14 March 1994")
        .await
        .unwrap();
    assert!(!result.is_degraded());
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[1].value, "14 March 1994");
}

#[tokio::test]
async fn test_unparseable_completion_is_degraded_not_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("Sorry, I can't help with that.")),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = extract_bio_data(&client, "some text").await.unwrap();
    assert!(result.items.is_empty());
    assert_eq!(
        result.raw.as_deref(),
        Some("Sorry, I can't help with that.")
    );
}

#[tokio::test]
async fn test_upstream_error_is_inference_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = extract_bio_data(&client, "text").await.unwrap_err();
    match err {
        Error::Inference(msg) => assert!(msg.contains("Incorrect API key provided")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .send(&build_extraction_request("text"))
        .await
        .unwrap_err();
    assert!(err.is_upstream());
    let message = err.to_string();
    assert!(message.contains("503"));
    assert!(message.contains("upstream down"));
}

#[tokio::test]
async fn test_blank_text_never_reaches_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = extract_bio_data(&client, "   \n").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}
