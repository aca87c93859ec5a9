mod common;

use common::{completion_body, connection_refused, ScriptedTransport};
use newscheck::{
    build_prompt, Backoff, ClassifierConfig, LanguageModel, ModelClient, ModelError, Prompt,
    RetryPolicy, TextPreprocessor,
};
use std::time::Duration;

fn prompt() -> Prompt {
    let cleaned = TextPreprocessor::default()
        .clean_and_validate("The central bank kept interest rates unchanged on Thursday")
        .unwrap();
    build_prompt(&cleaned)
}

fn client(transport: ScriptedTransport) -> ModelClient<ScriptedTransport> {
    common::init();
    ModelClient::with_transport(&ClassifierConfig::default(), transport)
}

#[tokio::test(start_paused = true)]
async fn test_connection_failures_use_every_attempt() {
    let client = client(ScriptedTransport::always(Err(connection_refused())));

    let err = client.complete(&prompt()).await.unwrap_err();

    assert!(matches!(err, ModelError::Connection { .. }));
    assert_eq!(client.transport().posts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_success_on_final_attempt() {
    let transport = ScriptedTransport::new(
        vec![
            Err(connection_refused()),
            Err(ModelError::Timeout {
                timeout: Duration::from_secs(120),
            }),
        ],
        Ok(completion_body(
            "CLASSIFICATION: REAL\nCONFIDENCE: 80%\nREASONING: Matches official records.",
        )),
    );
    let client = client(transport);

    let reply = client.complete(&prompt()).await.unwrap();

    assert!(reply.text.starts_with("CLASSIFICATION: REAL"));
    assert_eq!(reply.eval_count, 42);
    assert_eq!(client.transport().posts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_surface_after_budget() {
    let client = client(ScriptedTransport::always(Err(ModelError::Timeout {
        timeout: Duration::from_secs(120),
    })))
    .with_retry_policy(RetryPolicy::new(2, Backoff::Fixed(Duration::from_secs(1))));

    let err = client.complete(&prompt()).await.unwrap_err();

    assert_eq!(err, ModelError::Timeout { timeout: Duration::from_secs(120) });
    assert_eq!(client.transport().posts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_is_not_retried() {
    let client = client(ScriptedTransport::always(Err(ModelError::Server {
        status: 500,
        message: "model runner crashed".into(),
    })));

    let err = client.complete(&prompt()).await.unwrap_err();

    assert!(matches!(err, ModelError::Server { status: 500, .. }));
    assert_eq!(client.transport().posts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_overloaded_endpoint_is_retried() {
    let transport = ScriptedTransport::new(
        vec![Err(ModelError::Server { status: 503, message: "busy".into() })],
        Ok(completion_body("CLASSIFICATION: FAKE\nCONFIDENCE: 70%")),
    );
    let client = client(transport);

    let reply = client.complete(&prompt()).await.unwrap();

    assert!(reply.text.contains("FAKE"));
    assert_eq!(client.transport().posts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_overloaded_endpoint_exhausts_budget() {
    let client = client(ScriptedTransport::always(Err(ModelError::Server {
        status: 429,
        message: "too many requests".into(),
    })));

    let err = client.complete(&prompt()).await.unwrap_err();

    assert!(matches!(err, ModelError::Server { status: 429, .. }));
    assert_eq!(client.transport().posts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_is_not_retried() {
    let client = client(ScriptedTransport::always(Ok(br#"{"done":true}"#.to_vec())));

    let err = client.complete(&prompt()).await.unwrap_err();

    assert!(matches!(err, ModelError::MalformedResponse(_)));
    assert_eq!(client.transport().posts(), 1);
}

#[tokio::test]
async fn test_request_carries_model_settings() {
    let config = ClassifierConfig::default()
        .with_model("mistral:7b")
        .with_temperature(0.3)
        .with_max_tokens(200);
    let transport = ScriptedTransport::always(Ok(completion_body("CLASSIFICATION: REAL")));
    let client = ModelClient::with_transport(&config, transport);

    let prompt = prompt();
    client.complete(&prompt).await.unwrap();

    let body = client.transport().last_body().unwrap();
    assert_eq!(body["model"], "mistral:7b");
    assert_eq!(body["stream"], false);
    assert_eq!(body["prompt"], prompt.as_str());
    assert_eq!(body["options"]["num_predict"], 200);
    assert!((body["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
}

#[tokio::test]
async fn test_reply_model_defaults_to_configured() {
    let body = br#"{"response":"CLASSIFICATION: REAL"}"#.to_vec();
    let transport = ScriptedTransport::always(Ok(body));
    let client = client(transport);

    let reply = client.complete(&prompt()).await.unwrap();

    assert_eq!(reply.model, "llama3:8b");
    assert_eq!(reply.eval_count, 0);
}

#[tokio::test]
async fn test_health_check_lists_models() {
    let body = br#"{"models":[{"name":"llama3:8b","size":4661224676},{"name":"mistral:latest"}]}"#;
    let client = client(ScriptedTransport::always(Ok(body.to_vec())));

    let models = client.check_health().await.unwrap();

    assert_eq!(models, vec!["llama3:8b".to_string(), "mistral:latest".to_string()]);
    assert_eq!(client.transport().gets(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_health_check_makes_single_attempt() {
    let client = client(ScriptedTransport::always(Err(connection_refused())));

    let err = client.check_health().await.unwrap_err();

    assert!(matches!(err, ModelError::Connection { .. }));
    assert_eq!(client.transport().gets(), 1);
}
