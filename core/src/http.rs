//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe one HTTP exchange as plain data. `Exchange` builds an
//! `HttpRequest` from a descriptor and settles an `HttpResponse`; whoever owns
//! the socket (a `Transport` implementation, or a C host through the FFI
//! crate) executes the round-trip in between.
//!
//! All fields use owned types so values can cross FFI boundaries without
//! lifetime concerns.

use std::fmt;

use crate::error::ApiError;

/// HTTP method for a request. Tokens outside the common set are carried
/// verbatim (already uppercased) in `Extension`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Extension(String),
}

impl HttpMethod {
    /// Parse a method token case-insensitively. Empty tokens and tokens with
    /// characters outside the RFC 9110 `tchar` set are rejected.
    pub fn parse(token: &str) -> Result<Self, ApiError> {
        let upper = token.trim().to_ascii_uppercase();
        if upper.is_empty() || !upper.bytes().all(is_tchar) {
            return Err(ApiError::InvalidDescriptor(format!(
                "invalid method token {token:?}"
            )));
        }
        Ok(match upper.as_str() {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Extension(upper),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Extension(token) => token,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_tchar(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Basic-auth credentials attached when the transaction is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: Option<String>,
}

/// One part of a multipart form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Binary multipart form payload. Passed through to the transport untouched;
/// the transport chooses the boundary and the `Content-Type` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub parts: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormValue::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormValue::File {
                file_name: file_name.into(),
                content_type,
                bytes,
            },
        ));
        self
    }
}

/// Finalized request body, after encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Form(FormData),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Form(_) => None,
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// `None` sends a null payload.
    pub body: Option<Payload>,
    pub async_mode: bool,
    pub credentials: Option<Credentials>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data, built once the transaction has
/// reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Case-insensitive header lookup; the first match wins.
pub fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_uppercases() {
        assert_eq!(HttpMethod::parse("post").unwrap(), HttpMethod::Post);
        assert_eq!(HttpMethod::parse("GeT").unwrap(), HttpMethod::Get);
    }

    #[test]
    fn method_parse_keeps_extension_tokens() {
        let method = HttpMethod::parse("propfind").unwrap();
        assert_eq!(method, HttpMethod::Extension("PROPFIND".to_string()));
        assert_eq!(method.to_string(), "PROPFIND");
    }

    #[test]
    fn method_parse_rejects_bad_tokens() {
        assert!(matches!(
            HttpMethod::parse(""),
            Err(ApiError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            HttpMethod::parse("GE T"),
            Err(ApiError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = HttpResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: String::new(),
        };
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.header("X-Missing"), None);
    }
}
