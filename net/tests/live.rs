//! End-to-end dispatch against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the dispatcher over
//! real HTTP through `ReqwestTransport`. Covers encoding on the wire, JSON
//! parsing, status rejection and a streaming comet request.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use comet_core::{ApiError, Dispatcher, FormData, RequestOptions};
use comet_net::ReqwestTransport;
use mock_server::Echo;
use serde_json::{json, Map, Value};

async fn start_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    addr
}

fn dispatcher() -> Dispatcher<ReqwestTransport> {
    Dispatcher::new(ReqwestTransport::new().unwrap())
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn echo_of(body: Option<Value>) -> Echo {
    serde_json::from_value(body.expect("echo responds with JSON")).unwrap()
}

#[tokio::test]
async fn bare_url_fetches_and_parses_json() {
    let addr = start_server().await;
    let done = dispatcher().dispatch(format!("http://{addr}/json")).await.unwrap();
    assert_eq!(done.status, 200);
    assert_eq!(done.status_text, "OK");
    assert_eq!(done.json, Some(json!({"a": 1})));
}

#[tokio::test]
async fn plain_text_has_no_json() {
    let addr = start_server().await;
    let done = dispatcher().dispatch(format!("http://{addr}/text")).await.unwrap();
    assert_eq!(done.body, "plain text");
    assert_eq!(done.json, None);
}

#[tokio::test]
async fn url_encoded_body_reaches_server() {
    let addr = start_server().await;
    let options = RequestOptions::new(format!("http://{addr}/echo"))
        .method("post")
        .data(fields(json!({"foo": "a b", "bar": 2})));
    let echo = echo_of(dispatcher().dispatch(options).await.unwrap().json);
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, "foo=a%20b&bar=2");
}

#[tokio::test]
async fn json_body_reaches_server() {
    let addr = start_server().await;
    let options = RequestOptions::new(format!("http://{addr}/echo"))
        .method("put")
        .header("Content-Type", "text/plain")
        .content_type("application/json")
        .header("X-Trace", "abc")
        .data(fields(json!({"foo": "a b", "bar": 2})));
    let echo = echo_of(dispatcher().dispatch(options).await.unwrap().json);
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.body, r#"{"foo":"a b","bar":2}"#);
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.headers["x-trace"], "abc");
}

#[tokio::test]
async fn credentials_reach_server() {
    let addr = start_server().await;
    let options = RequestOptions::new(format!("http://{addr}/echo"))
        .credentials("ann", Some("pw".to_string()));
    let echo = echo_of(dispatcher().dispatch(options).await.unwrap().json);
    assert_eq!(echo.headers["authorization"], "Basic YW5uOnB3");
}

#[tokio::test]
async fn multipart_form_reaches_server() {
    let addr = start_server().await;
    let form = FormData::new()
        .text("title", "report")
        .file("upload", "r.csv", Some("text/csv".to_string()), b"a,b\n".to_vec());
    let options = RequestOptions::new(format!("http://{addr}/echo"))
        .method("post")
        .data(form);
    let echo = echo_of(dispatcher().dispatch(options).await.unwrap().json);
    assert!(echo.headers["content-type"].starts_with("multipart/form-data"));
    assert!(echo.body.contains("name=\"title\""));
    assert!(echo.body.contains("filename=\"r.csv\""));
}

#[tokio::test]
async fn error_status_rejects_with_reason_phrase() {
    let addr = start_server().await;
    let err = dispatcher()
        .dispatch(format!("http://{addr}/status/404"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    assert_eq!(err.to_string(), "Not Found");
}

#[tokio::test]
async fn malformed_json_rejects() {
    let addr = start_server().await;
    let err = dispatcher()
        .dispatch(format!("http://{addr}/malformed-json"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidJson(_)));
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = dispatcher()
        .dispatch(format!("http://{addr}/json"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn comet_streams_lines_before_completion() {
    let addr = start_server().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = RequestOptions::new(format!("http://{addr}/stream?lines=5&interval_ms=150"))
        .comet(move |line: &str| sink.lock().unwrap().push(line.to_string()))
        .comet_poll_rate(Duration::from_millis(20));

    let done = dispatcher().dispatch(options).await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(done.body, "line 1\nline 2\nline 3\nline 4\nline 5\n");
    assert!(!seen.is_empty(), "expected lines before completion");
    // Delivered lines are distinct, in order, and drawn from the body.
    let mut expected = (1..=5).map(|n| format!("line {n}"));
    for line in &seen {
        assert!(expected.any(|candidate| &candidate == line), "unexpected {line}");
    }
    let tail = done.comet_tail.expect("comet mode reports a tail");
    assert!(done.body.ends_with(&tail));
}
