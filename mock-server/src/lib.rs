use std::collections::BTreeMap;
use std::convert::Infallible;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use futures::stream;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

/// What `/echo` saw, returned as JSON so callers can assert on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(default = "default_lines")]
    pub lines: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_lines() -> u32 {
    3
}

fn default_interval_ms() -> u64 {
    60
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/json", get(json))
        .route("/text", get(text))
        .route("/malformed-json", get(malformed_json))
        .route("/status/{code}", any(status))
        .route("/stream", get(stream_lines))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    debug!(%method, len = body.len(), "echo");
    Json(Echo {
        method: method.to_string(),
        headers,
        body,
    })
}

async fn json() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "a": 1 }))
}

async fn text() -> &'static str {
    "plain text"
}

async fn malformed_json() -> Response {
    ([(header::CONTENT_TYPE, "application/json")], "{not json").into_response()
}

async fn status(Path(code): Path<u16>) -> Result<Response, StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")).into_response())
}

/// Emits `line N\n` every `interval_ms`, `lines` times, over one chunked body.
async fn stream_lines(Query(params): Query<StreamParams>) -> Response {
    let interval = Duration::from_millis(params.interval_ms);
    let total = params.lines;
    let lines = stream::unfold(1u32, move |n| async move {
        if n > total {
            return None;
        }
        tokio::time::sleep(interval).await;
        let chunk = Bytes::from(format!("line {n}\n"));
        Some((Ok::<_, Infallible>(chunk), n + 1))
    });
    ([(header::CONTENT_TYPE, "text/plain")], Body::from_stream(lines)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_serializes_to_json() {
        let echo = Echo {
            method: "POST".to_string(),
            headers: BTreeMap::from([("content-type".to_string(), "text/plain".to_string())]),
            body: "a=1".to_string(),
        };
        let json = serde_json::to_value(&echo).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["headers"]["content-type"], "text/plain");
        assert_eq!(json["body"], "a=1");
    }

    #[test]
    fn stream_params_have_defaults() {
        let params: StreamParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.lines, 3);
        assert_eq!(params.interval_ms, 60);
    }

    #[test]
    fn stream_params_accept_overrides() {
        let params: StreamParams =
            serde_json::from_str(r#"{"lines":5,"interval_ms":10}"#).unwrap();
        assert_eq!(params.lines, 5);
        assert_eq!(params.interval_ms, 10);
    }
}
