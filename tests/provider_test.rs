//! Wire-level tests against mock provider servers

use llm_consensus::config::LocalModelConfig;
use llm_consensus::llm::{Dispatcher, ModelBackend};
use llm_consensus::{Aggregator, Config, ConsensusError, ConsensusVerdict, ModelSelector, Outcome};
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Default registry with every endpoint pointed at the mock server
fn config_for(url: &str) -> Config {
    let mut config = Config::default();
    config.local.base_url = url.to_string();
    config.local.models.insert(
        "qwen2.5-coder-7b".to_string(),
        LocalModelConfig {
            model: "qwen2.5-coder:7b".to_string(),
            temperature: 0.5,
            max_tokens: 1024,
        },
    );
    for provider in config.providers.values_mut() {
        provider.base_url = format!("{}/v1", url);
        provider.api_key = "test-key".to_string();
    }
    config
}

#[tokio::test]
async fn test_local_generate_request_format() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({
            "model": "qwen2.5-coder:7b",
            "prompt": "Test prompt",
            "temperature": 0.5,
            "max_tokens": 1024,
            "stream": false,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"model": "qwen2.5-coder:7b", "response": "hello", "done": true}).to_string(),
        )
        .create_async()
        .await;

    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();
    let body = dispatcher
        .local()
        .query("qwen2.5-coder-7b", "Test prompt")
        .await
        .unwrap();

    assert_eq!(body["response"], "hello");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_local_default_model() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({
            "model": "llama3.1:latest",
            "prompt": "hi",
            "stream": false,
        })))
        .with_status(200)
        .with_body(json!({"response": "hey"}).to_string())
        .create_async()
        .await;

    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();
    let body = dispatcher.local().query_default("hi").await.unwrap();

    assert_eq!(body["response"], "hey");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_local_unknown_model_sends_nothing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .expect(0)
        .create_async()
        .await;

    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();
    let err = dispatcher.local().query("phi3", "x").await.unwrap_err();

    assert!(matches!(err, ConsensusError::UnknownLocalModel(ref m) if m == "phi3"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_local_server_error_propagates() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/generate")
        .with_status(500)
        .with_body("model crashed")
        .create_async()
        .await;

    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();
    let err = dispatcher
        .local()
        .query("qwen2.5-coder-7b", "x")
        .await
        .unwrap_err();

    assert!(matches!(err, ConsensusError::Http(_)));
}

#[tokio::test]
async fn test_chat_family_request_format() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Json(json!({
            "model": "mistral-large",
            "messages": [{"role": "user", "content": "Test prompt"}],
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": "ok"}}]}).to_string(),
        )
        .create_async()
        .await;

    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();
    let body = dispatcher
        .hosted()
        .query("mistral", "mistral-large", "Test prompt")
        .await
        .unwrap();

    assert_eq!(body["choices"][0]["message"]["content"], "ok");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_completion_family_default_max_tokens() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Json(json!({
            "model": "deepseek-coder",
            "prompt": "p",
            "max_tokens": 2048,
        })))
        .with_status(200)
        .with_body(json!({"choices": [{"text": "done"}]}).to_string())
        .create_async()
        .await;

    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();
    dispatcher
        .hosted()
        .query("deepseek", "deepseek-coder", "p")
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_completion_family_uses_context_length() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/completions")
        .match_body(Matcher::PartialJson(json!({"model": "grok-beta", "max_tokens": 4096})))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();
    dispatcher.hosted().query("xai", "grok-beta", "p").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_hosted_registry_errors() {
    let server = Server::new_async().await;
    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();

    let err = dispatcher.hosted().query("invalid", "test", "p").await.unwrap_err();
    assert_eq!(err.to_string(), "Unknown provider: invalid");

    let err = dispatcher
        .hosted()
        .query("mistral", "mistral-small", "p")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown model mistral-small for provider mistral");
}

#[tokio::test]
async fn test_hosted_unauthorized_propagates() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(json!({"message": "Unauthorized"}).to_string())
        .create_async()
        .await;

    let dispatcher = Dispatcher::new(config_for(&server.url())).unwrap();
    let err = dispatcher
        .hosted()
        .query("mistral", "mistral-large", "p")
        .await
        .unwrap_err();

    match err {
        ConsensusError::Http(e) => assert_eq!(e.status().map(|s| s.as_u16()), Some(401)),
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_api_key() {
    let server = Server::new_async().await;
    let mut config = config_for(&server.url());
    config.providers.get_mut("mistral").unwrap().api_key =
        "$LLM_CONSENSUS_DEFINITELY_UNSET".to_string();

    let dispatcher = Dispatcher::new(config).unwrap();
    let err = dispatcher
        .query(&ModelSelector::new("mistral", "mistral-large"), "p")
        .await
        .unwrap_err();

    assert!(matches!(err, ConsensusError::MissingApiKey(ref p) if p == "mistral"));
}

#[tokio::test]
async fn test_default_analysis_end_to_end() {
    let mut server = Server::new_async().await;
    let _local = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(json!({"response": "4"}).to_string())
        .create_async()
        .await;
    let _chat = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": "4"}}]}).to_string())
        .create_async()
        .await;
    let _completion = server
        .mock("POST", "/v1/completions")
        .with_status(503)
        .create_async()
        .await;

    let aggregator = Aggregator::new(config_for(&server.url())).unwrap();
    let report = aggregator.analyze("Test prompt", None).await;

    let keys: Vec<&str> = report.results.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "deepseek-deepseek-coder",
            "mistral-mistral-large",
            "ollama-qwen2.5-coder-7b",
        ]
    );
    assert!(report.results["deepseek-deepseek-coder"].is_error());
    assert_eq!(
        report.results["ollama-qwen2.5-coder-7b"],
        Outcome::Response(json!({"response": "4"}))
    );
    // Same answer, different body shapes
    assert_eq!(report.consensus, ConsensusVerdict::Disagreement);
}

#[tokio::test]
async fn test_identical_bodies_reach_agreement() {
    let mut server = Server::new_async().await;
    let _completion = server
        .mock("POST", "/v1/completions")
        .with_status(200)
        .with_body(json!({"choices": [{"text": "same"}]}).to_string())
        .expect(2)
        .create_async()
        .await;

    let aggregator = Aggregator::new(config_for(&server.url())).unwrap().parallel(true);
    let selectors = [
        ModelSelector::new("deepseek", "deepseek-coder"),
        ModelSelector::new("xai", "grok-beta"),
    ];
    let report = aggregator.analyze("q", Some(&selectors)).await;

    assert_eq!(report.error_count(), 0);
    assert_eq!(report.consensus, ConsensusVerdict::Agreement);
}

#[tokio::test]
async fn test_invalid_provider_through_aggregator() {
    let server = Server::new_async().await;
    let aggregator = Aggregator::new(config_for(&server.url())).unwrap();

    let report = aggregator
        .analyze("test", Some(&[ModelSelector::new("invalid", "test")]))
        .await;

    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!({
            "results": {"invalid-test": {"error": "Unknown provider: invalid"}},
            "consensus": "Disagreement",
        })
    );
}

#[tokio::test]
async fn test_unknown_models_through_aggregator() {
    let server = Server::new_async().await;
    let aggregator = Aggregator::new(config_for(&server.url())).unwrap();
    let selectors = [
        ModelSelector::new("mistral", "mistral-small"),
        ModelSelector::new("ollama", "phi3"),
    ];

    let report = aggregator.analyze("t", Some(&selectors)).await;

    assert_eq!(
        serde_json::to_value(&report.results).unwrap(),
        json!({
            "mistral-mistral-small": {"error": "Unknown model mistral-small for provider mistral"},
            "ollama-phi3": {"error": "Unknown model: phi3"},
        })
    );
    assert_eq!(report.consensus, ConsensusVerdict::Disagreement);
}

#[tokio::test]
async fn test_reordered_keys_disagree() {
    let mut server = Server::new_async().await;
    let _deepseek = server
        .mock("POST", "/v1/completions")
        .match_body(Matcher::PartialJson(json!({"model": "deepseek-coder"})))
        .with_status(200)
        .with_body(r#"{"a":1,"b":2}"#)
        .create_async()
        .await;
    let _xai = server
        .mock("POST", "/v1/completions")
        .match_body(Matcher::PartialJson(json!({"model": "grok-beta"})))
        .with_status(200)
        .with_body(r#"{"b":2,"a":1}"#)
        .create_async()
        .await;

    let aggregator = Aggregator::new(config_for(&server.url())).unwrap();
    let selectors = [
        ModelSelector::new("deepseek", "deepseek-coder"),
        ModelSelector::new("xai", "grok-beta"),
    ];
    let report = aggregator.analyze("q", Some(&selectors)).await;

    assert_eq!(report.error_count(), 0);
    assert_eq!(report.consensus, ConsensusVerdict::Disagreement);
}
