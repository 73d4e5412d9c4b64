//! HTTP mock tests for the retrying client.
//!
//! Uses wiremock to simulate transient failures, rate limits and slow
//! responses from the API.

use std::time::{Duration, Instant};

use pollilib::{ApiError, ClientConfig, PollinationsClient, RequestOptions, DEFAULT_REFERRER};
use reqwest::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).expect("valid mock URL")
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .len()
}

#[tokio::test]
async fn succeeds_after_transient_failures_with_backoff() {
    let server = MockServer::start().await;

    // Two 500s, then success. maxRetries=2 allows exactly three attempts.
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = PollinationsClient::new(ClientConfig::default().with_max_retries(2));
    let start = Instant::now();
    let response = client.get(endpoint(&server, "/generate")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
    assert_eq!(request_count(&server).await, 3);
    // Two waits happened: backoff(0) >= 1s and backoff(1) >= 2s.
    assert!(start.elapsed() >= Duration::from_secs(3));
}

#[tokio::test]
async fn exhaustion_raises_the_last_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = PollinationsClient::new(ClientConfig::default().with_max_retries(2));
    let result = client.get(endpoint(&server, "/generate")).await;

    // maxRetries + 1 total attempts, then the final error surfaces.
    assert_eq!(request_count(&server).await, 3);
    match result.unwrap_err() {
        ApiError::Http { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_honors_retry_after_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = PollinationsClient::new(ClientConfig::default().with_max_retries(1));
    let start = Instant::now();
    let response = client.get(endpoint(&server, "/generate")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(request_count(&server).await, 2);
    // The server-suggested delay wins over backoff(0), which caps at 1.1s.
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn rate_limit_on_final_attempt_is_exhaustion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let client = PollinationsClient::new(ClientConfig::default().with_max_retries(0));
    let start = Instant::now();
    let result = client.get(endpoint(&server, "/generate")).await;

    assert_eq!(request_count(&server).await, 1);
    // No sleep happens once the budget is spent.
    assert!(start.elapsed() < Duration::from_secs(2));
    match result.unwrap_err() {
        ApiError::RateLimited { retry_after } => assert_eq!(retry_after, Some(7)),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn referrer_travels_as_query_param_without_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .and(query_param("referrer", DEFAULT_REFERRER))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let client = PollinationsClient::with_defaults();
    let response = client.get(endpoint(&server, "/models")).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn bearer_token_uses_header_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::default()
        .with_bearer_token("test-token")
        .with_max_retries(0);
    let client = PollinationsClient::new(config);
    let response = client.get(endpoint(&server, "/models")).await.unwrap();
    assert_eq!(response.status(), 200);

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query().unwrap_or("").is_empty());
}

#[tokio::test]
async fn slow_responses_time_out_and_count_against_the_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::default()
        .with_timeout(Duration::from_millis(200))
        .with_max_retries(1);
    let client = PollinationsClient::new(config);
    let start = Instant::now();
    let result = client.get(endpoint(&server, "/generate")).await;

    // Both attempts aborted at the timeout instead of hanging.
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(request_count(&server).await, 2);
    match result.unwrap_err() {
        ApiError::Timeout(budget) => assert_eq!(budget, Duration::from_millis(200)),
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn caller_headers_and_json_body_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "hi" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PollinationsClient::new(ClientConfig::default().with_max_retries(0));
    let payload = serde_json::json!({ "model": "openai", "messages": [] });
    let response = client
        .execute(endpoint(&server, "/openai"), RequestOptions::post_json(payload))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "openai");
}
