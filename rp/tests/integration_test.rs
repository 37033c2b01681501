//! Integration tests for the request pacer
//!
//! These tests drive the public surface end-to-end against a local mock HTTP
//! server. The singleton is process-wide, so every test runs serialized and
//! starts from a fresh instance.

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use requestpacer::{Config, RequestPacer};

/// Millisecond-scale tuning so inter-batch pauses don't stall the suite
fn fast_config() -> Config {
    Config {
        batch_delay_min_ms: 10,
        batch_delay_max_ms: 25,
        dequeue_timeout_ms: 25,
        request_timeout_ms: 5_000,
        ..Config::default()
    }
}

async fn fresh_pacer(config: Config) -> Arc<RequestPacer> {
    RequestPacer::reset();
    let pacer = RequestPacer::instance();
    pacer.configure_with(config).await.expect("configure should succeed");
    pacer
}

// =============================================================================
// Submission path
// =============================================================================

#[tokio::test]
#[serial]
async fn test_get_before_configure_fails_and_enqueues_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    RequestPacer::reset();
    let pacer = RequestPacer::instance();

    let err = pacer.get(&server.uri()).await.unwrap_err();
    assert!(err.is_not_configured());

    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty(), "nothing should reach the server");
}

#[tokio::test]
#[serial]
async fn test_get_returns_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello world"))
        .mount(&server)
        .await;

    let pacer = fresh_pacer(fast_config()).await;

    let body = pacer.get(&format!("{}/hello", server.uri())).await.unwrap();
    assert_eq!(body, "hello world");

    pacer.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_raw_and_text_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("héllo wörld"))
        .mount(&server)
        .await;

    let pacer = fresh_pacer(fast_config()).await;
    let url = format!("{}/data", server.uri());

    let text = pacer.get(&url).await.unwrap();
    let bytes = pacer.get_raw(&url).await.unwrap();
    assert_eq!(text.as_bytes(), bytes.as_ref());

    pacer.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_non_success_status_still_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let pacer = fresh_pacer(fast_config()).await;

    let body = pacer.get(&format!("{}/missing", server.uri())).await.unwrap();
    assert_eq!(body, "not here");

    pacer.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_malformed_url_surfaces_transport_error() {
    let pacer = fresh_pacer(fast_config()).await;

    let err = pacer.get("this is not a url").await.unwrap_err();
    assert!(err.is_transport());

    pacer.shutdown().await;
}

// =============================================================================
// Batch behavior
// =============================================================================

#[tokio::test]
#[serial]
async fn test_every_request_resolves_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let pacer = fresh_pacer(fast_config()).await;

    // More than one batch's worth of requests
    let urls: Vec<String> = (0..8).map(|i| format!("{}/item/{}", server.uri(), i)).collect();
    let results = futures::future::join_all(urls.iter().map(|url| pacer.get(url))).await;

    assert_eq!(results.len(), 8);
    for result in results {
        assert_eq!(result.unwrap(), "ok");
    }

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 8, "each request hits the server exactly once");

    pacer.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_failing_operation_does_not_disturb_siblings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .mount(&server)
        .await;

    let pacer = fresh_pacer(fast_config()).await;

    // Both submissions land in the same batch; the refused connection must
    // not take the healthy one down with it
    let ok_url = format!("{}/ok", server.uri());
    let (good, bad) = tokio::join!(
        pacer.get(&ok_url),
        pacer.get("http://127.0.0.1:1/"),
    );

    assert_eq!(good.unwrap(), "fine");
    assert!(bad.unwrap_err().is_transport());

    pacer.shutdown().await;
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
#[serial]
async fn test_configure_twice_keeps_a_single_scheduler() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let pacer = fresh_pacer(fast_config()).await;
    // Second configure must be a no-op while the scheduler is alive
    pacer.configure_with(fast_config()).await.unwrap();

    let urls: Vec<String> = (0..4).map(|i| format!("{}/n/{}", server.uri(), i)).collect();
    let results = futures::future::join_all(urls.iter().map(|url| pacer.get(url))).await;
    for result in results {
        result.unwrap();
    }

    // A second live scheduler would double-execute queued operations
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 4);

    pacer.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_shutdown_is_idempotent_and_concurrent_safe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let pacer = fresh_pacer(fast_config()).await;
    pacer.get(&server.uri()).await.unwrap();

    // Concurrent and repeated shutdowns produce exactly one teardown
    tokio::join!(pacer.shutdown(), pacer.shutdown());
    pacer.shutdown().await;

    // The pacer is torn down; submissions fail fast instead of hanging
    let err = pacer.get(&server.uri()).await.unwrap_err();
    assert!(err.is_not_configured());
}

#[tokio::test]
#[serial]
async fn test_configure_revives_pacer_after_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("back"))
        .mount(&server)
        .await;

    let pacer = fresh_pacer(fast_config()).await;
    pacer.shutdown().await;

    pacer.configure_with(fast_config()).await.unwrap();
    assert_eq!(pacer.get(&server.uri()).await.unwrap(), "back");

    pacer.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_shutdown_abandons_queued_operations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    // Long inter-batch pause: whatever the first batch leaves behind sits in
    // the queue until shutdown abandons it
    let config = Config {
        batch_delay_min_ms: 2_000,
        batch_delay_max_ms: 3_000,
        dequeue_timeout_ms: 25,
        ..Config::default()
    };
    let pacer = fresh_pacer(config).await;

    let mut handles = Vec::new();
    for i in 0..6 {
        let pacer = pacer.clone();
        let url = format!("{}/q/{}", server.uri(), i);
        handles.push(tokio::spawn(async move { pacer.get(&url).await }));
    }

    // Wait for the first batch (3-5 operations) to reach the server
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let received = server.received_requests().await.unwrap();
        if received.len() >= 3 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "first batch never arrived");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    pacer.shutdown().await;

    let mut completed = 0;
    let mut abandoned = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(body) => {
                assert_eq!(body, "ok");
                completed += 1;
            }
            Err(err) => {
                assert!(err.is_abandoned(), "unexpected error: {err}");
                abandoned += 1;
            }
        }
    }

    assert_eq!(completed + abandoned, 6, "every submission resolves exactly once");
    assert!(completed >= 3, "the first batch ran to completion");
    assert!(abandoned >= 1, "a batch holds at most 5, so at least one was left behind");
}

// =============================================================================
// CLI
// =============================================================================

#[test]
fn test_cli_help_lists_get_command() {
    let mut cmd = assert_cmd::Command::cargo_bin("rp").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("get"));
}
