//! Request descriptors: what a caller hands to the dispatcher.
//!
//! # Design
//! A descriptor is either a bare URL or a full options record. The two shapes
//! are resolved exactly once, by `RequestDescriptor::into_options`, so the rest
//! of the crate only ever sees `RequestOptions`.
//!
//! Descriptors can also be read from JSON (the C ABI takes them that way): a
//! JSON string is a bare URL, a JSON object uses camelCase option keys.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::encode::coerce_to_string;
use crate::error::ApiError;
use crate::http::FormData;

/// Polling interval used when none is given.
pub const DEFAULT_COMET_POLL_RATE: Duration = Duration::from_millis(100);

/// Receives each newly completed line of a streaming response.
pub type CometCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Request body as supplied by the caller, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Flat key/value record, encoded as JSON or as a query string.
    Fields(Map<String, Value>),
    /// Multipart payload, passed through untouched.
    Form(FormData),
    /// Raw text, passed through untouched.
    Text(String),
}

impl From<Map<String, Value>> for RequestBody {
    fn from(fields: Map<String, Value>) -> Self {
        RequestBody::Fields(fields)
    }
}

impl From<FormData> for RequestBody {
    fn from(form: FormData) -> Self {
        RequestBody::Form(form)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl RequestBody {
    /// Interpret a JSON value as a body. `null` means no body; scalars and
    /// arrays are sent as their string coercion.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Object(fields) => Some(RequestBody::Fields(fields)),
            Value::String(text) => Some(RequestBody::Text(text)),
            other => Some(RequestBody::Text(coerce_to_string(&other))),
        }
    }
}

/// Full options record for one request.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Defaults to `GET`; case-insensitive.
    pub method: Option<String>,
    pub url: String,
    pub data: Option<RequestBody>,
    /// Applied in order. Names are matched case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Shorthand for the `Content-Type` header; overrides `headers`.
    pub content_type: Option<String>,
    /// Accepted for compatibility; see `Exchange::open`.
    pub async_mode: Option<bool>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub comet: Option<CometCallback>,
    pub comet_poll_rate: Option<Duration>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("async_mode", &self.async_mode)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("comet", &self.comet.is_some())
            .field("comet_poll_rate", &self.comet_poll_rate)
            .finish()
    }
}

impl RequestOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn data(mut self, data: impl Into<RequestBody>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = Some(user.into());
        self.password = password;
        self
    }

    pub fn comet<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.comet = Some(Arc::new(callback));
        self
    }

    pub fn comet_poll_rate(mut self, rate: Duration) -> Self {
        self.comet_poll_rate = Some(rate);
        self
    }

    /// Effective polling interval. Zero falls back to the default.
    pub fn poll_rate(&self) -> Duration {
        match self.comet_poll_rate {
            Some(rate) if !rate.is_zero() => rate,
            _ => DEFAULT_COMET_POLL_RATE,
        }
    }
}

/// Either a bare URL or a full options record.
#[derive(Debug, Clone)]
pub enum RequestDescriptor {
    Url(String),
    Options(RequestOptions),
}

impl RequestDescriptor {
    pub fn into_options(self) -> RequestOptions {
        match self {
            RequestDescriptor::Url(url) => RequestOptions::new(url),
            RequestDescriptor::Options(options) => options,
        }
    }

    /// Read a descriptor from JSON text. Comet callbacks cannot be expressed
    /// in JSON and are attached by the caller afterwards.
    pub fn from_json(text: &str) -> Result<Self, ApiError> {
        let raw: RawDescriptor =
            serde_json::from_str(text).map_err(|e| ApiError::InvalidDescriptor(e.to_string()))?;
        Ok(match raw {
            RawDescriptor::Url(url) => RequestDescriptor::Url(url),
            RawDescriptor::Options(raw) => RequestDescriptor::Options(raw.into()),
        })
    }
}

impl From<&str> for RequestDescriptor {
    fn from(url: &str) -> Self {
        RequestDescriptor::Url(url.to_string())
    }
}

impl From<String> for RequestDescriptor {
    fn from(url: String) -> Self {
        RequestDescriptor::Url(url)
    }
}

impl From<RequestOptions> for RequestDescriptor {
    fn from(options: RequestOptions) -> Self {
        RequestDescriptor::Options(options)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDescriptor {
    Url(String),
    Options(RawOptions),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOptions {
    #[serde(default)]
    method: Option<String>,
    url: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default, rename = "async")]
    async_mode: Option<bool>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    password: Option<String>,
    /// Milliseconds.
    #[serde(default)]
    comet_poll_rate: Option<u64>,
}

impl From<RawOptions> for RequestOptions {
    fn from(raw: RawOptions) -> Self {
        RequestOptions {
            method: raw.method,
            url: raw.url,
            data: RequestBody::from_json(raw.data),
            headers: raw
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), coerce_to_string(value)))
                .collect(),
            content_type: raw.content_type,
            async_mode: raw.async_mode,
            user: raw.user,
            password: raw.password,
            comet: None,
            comet_poll_rate: raw.comet_poll_rate.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_url_becomes_default_options() {
        let options = RequestDescriptor::from("http://localhost/a").into_options();
        assert_eq!(options.url, "http://localhost/a");
        assert!(options.method.is_none());
        assert!(options.data.is_none());
        assert!(options.headers.is_empty());
        assert!(options.comet.is_none());
        assert_eq!(options.poll_rate(), DEFAULT_COMET_POLL_RATE);
    }

    #[test]
    fn zero_poll_rate_falls_back_to_default() {
        let options = RequestOptions::new("http://x").comet_poll_rate(Duration::ZERO);
        assert_eq!(options.poll_rate(), Duration::from_millis(100));
    }

    #[test]
    fn json_string_is_bare_url() {
        let descriptor = RequestDescriptor::from_json(r#""http://localhost/x""#).unwrap();
        assert!(matches!(descriptor, RequestDescriptor::Url(ref u) if u == "http://localhost/x"));
    }

    #[test]
    fn json_object_reads_camel_case_options() {
        let descriptor = RequestDescriptor::from_json(
            r#"{
                "method": "post",
                "url": "http://localhost/echo",
                "data": {"foo": "a b", "bar": 2},
                "headers": {"X-Count": 3},
                "contentType": "application/json",
                "async": false,
                "user": "ann",
                "cometPollRate": 50
            }"#,
        )
        .unwrap();
        let options = descriptor.into_options();
        assert_eq!(options.method.as_deref(), Some("post"));
        assert_eq!(options.headers, vec![("X-Count".to_string(), "3".to_string())]);
        assert_eq!(options.content_type.as_deref(), Some("application/json"));
        assert_eq!(options.async_mode, Some(false));
        assert_eq!(options.user.as_deref(), Some("ann"));
        assert_eq!(options.poll_rate(), Duration::from_millis(50));
        let Some(RequestBody::Fields(fields)) = options.data else {
            panic!("expected field body");
        };
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["foo", "bar"]);
    }

    #[test]
    fn json_without_url_is_rejected() {
        let err = RequestDescriptor::from_json(r#"{"method":"GET"}"#).unwrap_err();
        assert!(matches!(err, ApiError::InvalidDescriptor(_)));
    }

    #[test]
    fn json_string_data_is_text_body() {
        let options = RequestDescriptor::from_json(r#"{"url":"http://x","data":"raw=1"}"#)
            .unwrap()
            .into_options();
        assert_eq!(options.data, Some(RequestBody::Text("raw=1".to_string())));
    }

    #[test]
    fn debug_redacts_password() {
        let options = RequestOptions::new("http://x").credentials("ann", Some("secret".into()));
        let rendered = format!("{options:?}");
        assert!(!rendered.contains("secret"));
    }
}
