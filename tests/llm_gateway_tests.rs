// Tests for the completion gateway client against a mock HTTP endpoint

use diana_engine::core::{AnswerExtractor, ExtractionContext};
use diana_engine::models::{ChatMessage, Profile};
use diana_engine::services::{LlmClient, LlmConfig, LlmError, LlmExtractor};
use mockito::Server;

fn test_config(base_url: String, max_retries: u32) -> LlmConfig {
    LlmConfig {
        api_key: "test_key".to_string(),
        model: "gpt-4o-mini".to_string(),
        base_url,
        timeout_secs: 5,
        max_retries,
    }
}

fn history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::assistant("How old are you?"),
        ChatMessage::user("guess!"),
    ]
}

#[tokio::test]
async fn test_chat_parses_function_call_and_content() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "choices": [{
                    "message": {
                        "content": "22, lovely!",
                        "tool_calls": [{
                            "function": {
                                "name": "extract_profile_data",
                                "arguments": "{\"age\": 22}"
                            }
                        }]
                    }
                }]
            }"#,
        )
        .create_async()
        .await;

    let client = LlmClient::new(test_config(server.url(), 0));
    let reply = client.chat("system prompt", &history(), "I'm 22").await.unwrap();

    assert_eq!(reply.content.as_deref(), Some("22, lovely!"));
    assert_eq!(reply.extracted.unwrap()["age"], 22);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_free_text_only() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": [{"message": {"content": "Come on, tell me!"}}]}"#)
        .create_async()
        .await;

    let client = LlmClient::new(test_config(server.url(), 0));
    let reply = client.chat("system prompt", &[], "guess!").await.unwrap();

    assert_eq!(reply.content.as_deref(), Some("Come on, tell me!"));
    assert!(reply.extracted.is_none());
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mut server = Server::new_async().await;
    // Initial attempt plus one retry
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("boom")
        .expect(2)
        .create_async()
        .await;

    let client = LlmClient::new(test_config(server.url(), 1));
    let err = client.chat("system prompt", &[], "hello").await.unwrap_err();

    assert!(matches!(err, LlmError::Unavailable(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_bad_request_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_body("malformed request")
        .expect(1)
        .create_async()
        .await;

    let client = LlmClient::new(test_config(server.url(), 3));
    let err = client.chat("system prompt", &[], "hello").await.unwrap_err();

    assert!(matches!(err, LlmError::InvalidRequest(_)));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let client = LlmClient::new(test_config(server.url(), 3));
    let err = client.chat("system prompt", &[], "hello").await.unwrap_err();

    assert!(matches!(err, LlmError::Unauthorized));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_body_degrades_to_abstention() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body("this is not json")
        .create_async()
        .await;

    let extractor = LlmExtractor::new(LlmClient::new(test_config(server.url(), 0)));
    let profile = Profile::default();

    let extraction = extractor
        .extract(ExtractionContext {
            history: &[],
            message: "hello",
            profile: &profile,
            target: None,
        })
        .await
        .unwrap();

    // The dialogue keeps moving on a garbage completion body
    assert!(extraction.updates.is_empty());
    assert!(extraction.reply.is_none());
}

#[tokio::test]
async fn test_request_declares_extraction_function() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"tools": [{"type": "function", "function": {"name": "extract_profile_data"}}]}"#
                .to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": [{"message": {"content": "ok"}}]}"#)
        .create_async()
        .await;

    let client = LlmClient::new(test_config(server.url(), 0));
    client.chat("system prompt", &[], "hello").await.unwrap();

    mock.assert_async().await;
}
