//! Ingest endpoint tests driving the router directly.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use clap::Parser;
use honeylog::{
    build_router,
    config::{Args, Config},
    error::SinkError,
    ingest::Ingester,
    models::Event,
    sampler::{EmaSampler, SamplerConfig},
    sink::EventSink,
    state::AppState,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Default)]
struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl EventSink for MemorySink {
    fn send(&self, event: Event) -> Result<(), SinkError> {
        self.events.lock().push(event);
        Ok(())
    }
}

fn app(extra: &[&str]) -> (Router, Arc<MemorySink>) {
    let mut argv = vec!["honeylog", "--dataset", "test"];
    argv.extend_from_slice(extra);
    let config = Config::from_args(Args::try_parse_from(argv).unwrap()).unwrap();

    let sink = Arc::new(MemorySink::default());
    let sampler = Arc::new(EmaSampler::new(SamplerConfig::default()));
    let ingester = Ingester::new(&config, sampler, sink.clone());
    let state = Arc::new(AppState::new(ingester));
    (build_router(state, config.max_body_size), sink)
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(body.into())
        .unwrap()
}

#[tokio::test]
async fn acknowledges_batches_with_bad_lines() {
    let (app, sink) = app(&["--sampling-fields", "user"]);
    let mut body = String::new();
    for i in 0..10 {
        if i < 3 {
            body.push_str("oops\n");
        } else {
            body.push_str(&format!("{{\"user\":\"u{}\"}}\n", i));
        }
    }

    let response = app.oneshot(post("/", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
    assert_eq!(sink.events.lock().len(), 7);
}

#[tokio::test]
async fn accepts_any_path() {
    let (app, sink) = app(&["--sampling-fields", "user"]);
    let response = app
        .oneshot(post("/logs/nginx", "{\"user\":\"a\"}\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sink.events.lock().len(), 1);
}

#[tokio::test]
async fn forwards_normalized_records() {
    let (app, sink) = app(&["--sampling-fields", "user", "--url-fields", "path"]);
    let response = app
        .oneshot(post("/", r#"{"user":"a","path":"/x/1?y=2","tags":["p","q"]}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let events = sink.events.lock();
    let event = &events[0];
    assert_eq!(event.sample_key, "a");
    assert_eq!(event.sample_rate, 1);
    // full path as parsed, the "/x" grouping lives in path.pathShape
    assert_eq!(event.data["path.path"], json!("/x/1"));
    assert_eq!(event.data["path.query"], json!("y=2"));
    assert_eq!(event.data["tags"], json!("p,q"));
}

#[tokio::test]
async fn rejects_bodies_over_the_limit() {
    let (app, sink) = app(&["--sampling-fields", "user", "--max-body-size", "16"]);
    let response = app
        .oneshot(post("/", "{\"user\":\"a\"}\n{\"user\":\"b\"}\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(sink.events.lock().is_empty());
}

#[tokio::test]
async fn health_reports_sampler_state() {
    let (app, _) = app(&["--sampling-fields", "user"]);
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["sampler_keys"], json!(0));
}

#[tokio::test]
async fn metrics_are_exposed() {
    let (app, _) = app(&["--sampling-fields", "user"]);
    let response = app
        .clone()
        .oneshot(post("/", "{\"user\":\"a\"}\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("honeylog_lines_total"));
    assert!(text.contains("honeylog_sampler_keys"));
}
