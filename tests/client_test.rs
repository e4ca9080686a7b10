//! Integration tests against a mock OpenAI-compatible server.
//!
//! These verify what actually goes over the wire: paths, headers, and the
//! message list built for each call.

use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use openai_adapter::config::{DEFAULT_AZURE_API_VERSION, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use openai_adapter::{Client, ClientOption, Error};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn chat_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": content
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "total_tokens": 15
        }
    })
}

fn client_for(server: &MockServer, extra: Vec<ClientOption>) -> Client {
    let mut options = vec![
        ClientOption::Token("test-key".into()),
        ClientOption::BaseUrl(server.uri()),
    ];
    options.extend(extra);
    Client::new(options).expect("Failed to create client")
}

fn request_body(request: &Request) -> Value {
    serde_json::from_slice(&request.body).expect("request body is JSON")
}

#[tokio::test]
async fn test_completion_sends_default_system_prompt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": DEFAULT_MODEL,
            "max_tokens": 2000,
            "messages": [
                {"role": "system", "content": DEFAULT_SYSTEM_PROMPT},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("Hi there")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, vec![]);
    let response = client.completion("", "Hello").await.unwrap();

    assert_eq!(response.content, "Hi there");
    assert_eq!(response.usage.prompt_tokens, 10);
    assert_eq!(response.usage.completion_tokens, 5);
    assert_eq!(response.usage.total_tokens, 15);
}

#[tokio::test]
async fn test_completion_uses_caller_prompt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "Answer in French."},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("Bonjour")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, vec![]);
    let response = client.completion("Answer in French.", "Hello").await.unwrap();
    assert_eq!(response.content, "Bonjour");
}

#[tokio::test]
async fn test_custom_headers_sent_with_sdk_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("X-Trace", "abc"))
        .and(header("X-Team", "infra"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("OpenAI-Organization", "org-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(
        &mock_server,
        vec![
            ClientOption::OrgId("org-1".into()),
            ClientOption::Headers(vec![
                "X-Trace=abc".into(),
                "X-Team = infra".into(),
                "malformed".into(),
            ]),
        ],
    );

    client.completion("", "one").await.unwrap();
    client.create_chat_completion("", "two").await.unwrap();
}

#[tokio::test]
async fn test_custom_header_does_not_override_sdk_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("X-Trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(
        &mock_server,
        vec![ClientOption::Headers(vec![
            "Authorization=Bearer other".into(),
            "X-Trace=abc".into(),
        ])],
    );
    client.completion("", "Hello").await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let auth: Vec<_> = requests[0].headers.get_all("authorization").iter().collect();
    assert_eq!(auth.len(), 1);
    assert_eq!(auth[0], "Bearer test-key");
}

#[tokio::test]
async fn test_sampling_parameters_in_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(
        &mock_server,
        vec![
            ClientOption::Model("deepseek-chat".into()),
            ClientOption::MaxTokens(256),
            ClientOption::Temperature(0.0),
            ClientOption::TopP(0.5),
            ClientOption::PresencePenalty(0.25),
            ClientOption::FrequencyPenalty(0.75),
        ],
    );
    client.completion("", "Hello").await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body = request_body(&requests[0]);

    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["max_tokens"], 256);
    // Temperature 0 falls back to the default rather than being sent literally.
    assert_eq!(body["temperature"], 1.0);
    assert_eq!(body["top_p"], 0.5);
    assert_eq!(body["presence_penalty"], 0.25);
    assert_eq!(body["frequency_penalty"], 0.75);
}

#[tokio::test]
async fn test_azure_deployment_is_configured_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-4/chat/completions"))
        .and(query_param("api-version", "2024-06-01"))
        .and(header("api-key", "t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("from azure")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new([
        ClientOption::Token("t".into()),
        ClientOption::Provider("azure".into()),
        ClientOption::BaseUrl(mock_server.uri()),
        ClientOption::Model("gpt-4".into()),
        ClientOption::ApiVersion("2024-06-01".into()),
    ])
    .unwrap();

    let response = client.completion("", "Hello").await.unwrap();
    assert_eq!(response.content, "from azure");
}

#[tokio::test]
async fn test_azure_default_api_version() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-4/chat/completions"))
        .and(query_param("api-version", DEFAULT_AZURE_API_VERSION))
        .and(header("api-key", "t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("from azure")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new([
        ClientOption::Token("t".into()),
        ClientOption::Provider("azure".into()),
        ClientOption::BaseUrl(mock_server.uri()),
        ClientOption::Model("gpt-4".into()),
    ])
    .unwrap();

    let response = client.completion("", "Hello").await.unwrap();
    assert_eq!(response.content, "from azure");
}

#[tokio::test]
async fn test_empty_choices_is_empty_response() {
    let mock_server = MockServer::start().await;

    let mut body = chat_response("unused");
    body["choices"] = json!([]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, vec![]);

    // The low-level call hands back the empty list untouched.
    let raw = client.create_chat_completion("", "Hello").await.unwrap();
    assert!(raw.choices.is_empty());

    let err = client.completion("", "Hello").await.unwrap_err();
    assert!(matches!(err, Error::EmptyResponse));
}

#[tokio::test]
async fn test_backend_error_carries_operation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "model not found",
                "type": "invalid_request_error",
                "param": null,
                "code": "model_not_found"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, vec![]);
    let err = client.completion("", "Hello").await.unwrap_err();

    match &err {
        Error::Backend { operation, .. } => assert_eq!(*operation, "chat completion"),
        other => panic!("expected backend error, got {other:?}"),
    }
    assert!(err.to_string().contains("model not found"));
}

#[tokio::test]
async fn test_rate_limited_call_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "message": "slow down",
                "type": "requests",
                "param": null,
                "code": null
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, vec![]);
    let err = tokio::time::timeout(Duration::from_secs(5), client.completion("", "Hello"))
        .await
        .expect("rate-limited call returned promptly")
        .unwrap_err();

    match &err {
        Error::Backend { operation, .. } => assert_eq!(*operation, "chat completion"),
        other => panic!("expected backend error, got {other:?}"),
    }
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_message_history_sent_unmodified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("4")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content("You are a calculator.")
            .build()
            .unwrap()
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content("1+1?")
            .build()
            .unwrap()
            .into(),
        ChatCompletionRequestAssistantMessageArgs::default()
            .content("2")
            .build()
            .unwrap()
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content("2+2?")
            .build()
            .unwrap()
            .into(),
    ];

    let client = client_for(&mock_server, vec![]);
    let response = client
        .create_chat_completion_with_messages(messages)
        .await
        .unwrap();
    assert_eq!(response.choices.len(), 1);

    let requests = mock_server.received_requests().await.unwrap();
    let sent = request_body(&requests[0]);
    let sent = sent["messages"].as_array().unwrap();

    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0]["role"], "system");
    assert_eq!(sent[2]["role"], "assistant");
    assert_eq!(sent[2]["content"], "2");
    assert_eq!(sent[3]["content"], "2+2?");
}

#[tokio::test]
async fn test_image_completion_message_layout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("A boardwalk")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, vec![ClientOption::Model("gpt-4o".into())]);
    let response = client
        .image_completion("https://example.com/a.jpg", "Be concise.", "Describe this image")
        .await
        .unwrap();
    assert_eq!(response.content, "A boardwalk");

    let requests = mock_server.received_requests().await.unwrap();
    let body = request_body(&requests[0]);
    let messages = body["messages"].as_array().unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    let parts = messages[0]["content"].as_array().unwrap();
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[0]["text"], "Describe this image");
    assert_eq!(parts[1]["type"], "image_url");
    assert_eq!(parts[1]["image_url"]["url"], "https://example.com/a.jpg");
    assert_eq!(messages[1]["role"], "system");
    assert_eq!(messages[1]["content"], "Be concise.");
}

#[tokio::test]
async fn test_image_chat_without_prompt_has_no_system_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The low-level call does not consult the capability table.
    let client = client_for(&mock_server, vec![ClientOption::Model("llama3".into())]);
    client
        .create_image_chat_completion("https://example.com/a.jpg", "", "What is this?")
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let body = request_body(&requests[0]);
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_image_completion_rejects_unknown_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, vec![ClientOption::Model("deepseek-chat".into())]);
    let err = client
        .image_completion("https://example.com/a.jpg", "", "Describe")
        .await
        .unwrap_err();

    match err {
        Error::UnsupportedOperation { model, .. } => assert_eq!(model, "deepseek-chat"),
        other => panic!("expected unsupported operation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_image_completion_with_registered_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("a cat")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(
        &mock_server,
        vec![
            ClientOption::Model("lmstudio-community/my-vlm".into()),
            ClientOption::VisionModels(vec!["my-vlm".into()]),
        ],
    );
    let response = client
        .image_completion("https://example.com/cat.png", "", "What animal?")
        .await
        .unwrap();
    assert_eq!(response.content, "a cat");
}

#[tokio::test]
async fn test_concurrent_calls_share_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, vec![]);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move { client.completion("", &format!("call {i}")).await })
        })
        .collect();

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.content, "ok");
    }
}
