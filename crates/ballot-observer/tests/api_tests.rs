//! Integration tests for the HTTP endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, except for the final test which exercises the
//! real listener and graceful shutdown.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use ballot_core::config::ServerSettings;
use ballot_core::{Ballot, BallotConfig};
use ballot_observer::router::build_router;
use ballot_observer::spawn_observer;
use ballot_observer::state::AppState;
use futures::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn start(candidates: &[&str]) -> (Ballot, Arc<AppState>) {
    let mut config = BallotConfig::with_candidates(candidates.iter().copied());
    config.queue.capacity = 64;
    config.subscribers.buffer_capacity = 16;
    let ballot = Ballot::start(&config);
    let state = Arc::new(AppState::new(ballot.clone()));
    (ballot, state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_for_total(ballot: &Ballot, total: u64) {
    let mut reader = ballot.snapshot_reader();
    assert!(
        reader
            .wait_until(|list| list.iter().map(|c| c.votes).sum::<u64>() == total)
            .await
    );
}

// ---------------------------------------------------------------------------
// /vote
// ---------------------------------------------------------------------------

#[tokio::test]
async fn vote_is_accepted_and_counted() {
    let (ballot, state) = start(&["Candidate A", "Candidate B"]);
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(get("/vote?candidate=Candidate%20A"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let post = Request::builder()
        .method(Method::POST)
        .uri("/vote?candidate=Candidate%20B")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(post).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    wait_for_total(&ballot, 2).await;

    let response = router.oneshot(get("/results")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(
        json,
        serde_json::json!([
            { "name": "Candidate A", "votes": 1 },
            { "name": "Candidate B", "votes": 1 },
        ])
    );
    let _ = ballot.shutdown().await;
}

#[tokio::test]
async fn vote_without_candidate_is_bad_request() {
    let (ballot, state) = start(&["A", "B"]);
    let router = build_router(state);

    for uri in ["/vote", "/vote?candidate="] {
        let response = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_to_json(response.into_body()).await;
        assert_eq!(json["status"], 400);
        assert_eq!(json["error"], "Candidate name is required");
    }
    let _ = ballot.shutdown().await;
}

#[tokio::test]
async fn vote_for_unknown_candidate_is_accepted_by_default() {
    let (ballot, state) = start(&["A", "B"]);
    let router = build_router(state);

    let response = router.oneshot(get("/vote?candidate=Z")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let report = ballot.shutdown().await;
    assert_eq!(report.applier.unknown, 1);
    assert_eq!(report.applier.applied, 0);
}

#[tokio::test]
async fn vote_for_unknown_candidate_is_not_found_when_validating() {
    let mut config = BallotConfig::with_candidates(["A", "B"]);
    config.ballot.validate_on_submit = true;
    let ballot = Ballot::start(&config);
    let router = build_router(Arc::new(AppState::new(ballot.clone())));

    let response = router.oneshot(get("/vote?candidate=Z")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
    let _ = ballot.shutdown().await;
}

#[tokio::test]
async fn vote_during_shutdown_is_unavailable() {
    let (ballot, state) = start(&["A", "B"]);
    let router = build_router(state);
    let _ = ballot.shutdown().await;

    let response = router.oneshot(get("/vote?candidate=A")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 503);
}

// ---------------------------------------------------------------------------
// /results and /api/status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn results_start_at_zero_ordered_by_name() {
    let (ballot, state) = start(&["B", "A"]);
    let router = build_router(state);

    let response = router.oneshot(get("/results")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(
        json,
        serde_json::json!([
            { "name": "A", "votes": 0 },
            { "name": "B", "votes": 0 },
        ])
    );
    let _ = ballot.shutdown().await;
}

#[tokio::test]
async fn status_reports_counters() {
    let (ballot, state) = start(&["A", "B"]);
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(get("/vote?candidate=A"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    wait_for_total(&ballot, 1).await;

    let response = router.oneshot(get("/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["counters"]["votes_accepted"], 1);
    assert_eq!(json["counters"]["votes_applied"], 1);
    assert_eq!(json["subscribers"], 0);
    assert_eq!(json["shutting_down"], false);
    assert!(json["started_at"].is_string());
    assert_eq!(json["candidates"][0]["votes"], 1);
    let _ = ballot.shutdown().await;
}

// ---------------------------------------------------------------------------
// CORS
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_headers_are_present() {
    let (ballot, state) = start(&["A", "B"]);
    let router = build_router(state);

    let request = Request::builder()
        .uri("/results")
        .header(header::ORIGIN, "http://dashboard.example")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/vote")
        .header(header::ORIGIN, "http://dashboard.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(preflight).await.unwrap();
    assert!(response.status().is_success());
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));

    let bare = Request::builder()
        .method(Method::OPTIONS)
        .uri("/vote")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(bare).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let _ = ballot.shutdown().await;
}

// ---------------------------------------------------------------------------
// /events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn event_stream_sends_snapshot_then_updates() {
    let (ballot, state) = start(&["A", "B"]);
    let router = build_router(state);

    let response = router.oneshot(get("/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    assert_eq!(
        &first[..],
        b"data: [{\"name\":\"A\",\"votes\":0},{\"name\":\"B\",\"votes\":0}]\n\n"
    );

    assert!(ballot.submit_vote("B").is_ok());
    let second = body.next().await.unwrap().unwrap();
    assert_eq!(&second[..], b"data: {\"name\":\"B\",\"votes\":1}\n\n");

    // Closing the stream unregisters the subscriber.
    drop(body);
    tokio::time::timeout(Duration::from_secs(5), async {
        while ballot.subscriber_count().await.unwrap() != 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let _ = ballot.shutdown().await;
}

#[tokio::test]
async fn event_stream_ends_on_shutdown() {
    let (ballot, state) = start(&["A", "B"]);
    let router = build_router(state);

    let response = router.oneshot(get("/events")).await.unwrap();
    let mut body = response.into_body().into_data_stream();
    let _snapshot = body.next().await.unwrap().unwrap();

    let report = ballot.shutdown().await;
    assert_eq!(report.registry.handles_closed, 1);

    let rest = tokio::time::timeout(Duration::from_secs(5), async {
        let mut rest = Vec::new();
        while let Some(chunk) = body.next().await {
            rest.push(chunk.unwrap());
        }
        rest
    })
    .await
    .unwrap();
    assert!(rest.is_empty());
}

// ---------------------------------------------------------------------------
// Real listener
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_answers_over_tcp_and_stops_on_cancel() {
    let (ballot, state) = start(&["A", "B"]);
    let settings = ServerSettings {
        host: String::from("127.0.0.1"),
        port: 0,
        shutdown_timeout_secs: 1,
    };
    let shutdown = CancellationToken::new();
    let (handle, addr) = spawn_observer(&settings, state, shutdown.clone())
        .await
        .unwrap();

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /results HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 200"));
    assert!(raw.contains(r#"[{"name":"A","votes":0},{"name":"B","votes":0}]"#));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    let _ = ballot.shutdown().await;
}
