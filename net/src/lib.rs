//! `reqwest`-backed `Transport` for the comet dispatcher.
//!
//! # Design
//! The core crate never touches a socket. This crate supplies the one piece of
//! real I/O: it maps an `HttpRequest` onto a `reqwest::RequestBuilder`, sends
//! it, and streams the body into the shared `ResponseBuffer` chunk by chunk so
//! the dispatcher's polling reader can observe it while it grows.
//!
//! Redirects, cookies and TLS are whatever the supplied `reqwest::Client` is
//! configured to do.

use std::future::Future;

use comet_core::{
    FormData, FormValue, HttpRequest, Payload, ResponseBuffer, ResponseHead, Transport,
    TransportError,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use tracing::{debug, trace};

/// Executes requests with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().build().map_err(transport_error)?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (proxies, redirect policy, cookie store).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: HttpRequest) -> Result<RequestBuilder, TransportError> {
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::new(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);

        let is_form = matches!(request.body, Some(Payload::Form(_)));
        for (name, value) in &request.headers {
            // Multipart bodies carry their own boundary in the content type.
            if is_form && name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(credentials) = request.credentials {
            builder = builder.basic_auth(credentials.user, credentials.password);
        }

        builder = match request.body {
            None => builder,
            Some(Payload::Text(text)) => builder.body(text),
            Some(Payload::Form(form)) => builder.multipart(multipart(form)?),
        };
        Ok(builder)
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: HttpRequest,
        buffer: ResponseBuffer,
    ) -> impl Future<Output = Result<ResponseHead, TransportError>> + Send {
        let url = request.url.clone();
        let builder = self.build(request);
        async move {
            let mut response = builder?.send().await.map_err(transport_error)?;
            let status = response.status();
            debug!(url = %url, status = status.as_u16(), "response headers received");

            let head = ResponseHead {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
                headers: response
                    .headers()
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .to_str()
                            .ok()
                            .map(|value| (name.as_str().to_string(), value.to_string()))
                    })
                    .collect(),
            };

            while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
                trace!(url = %url, len = chunk.len(), "body chunk");
                buffer.append(&chunk);
            }
            Ok(head)
        }
    }
}

fn multipart(form: FormData) -> Result<Form, TransportError> {
    let mut multipart = Form::new();
    for (name, value) in form.parts {
        multipart = match value {
            FormValue::Text(text) => multipart.text(name, text),
            FormValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                let mut part = Part::bytes(bytes).file_name(file_name);
                if let Some(content_type) = content_type {
                    part = part.mime_str(&content_type).map_err(transport_error)?;
                }
                multipart.part(name, part)
            }
        };
    }
    Ok(multipart)
}

fn transport_error(err: reqwest::Error) -> TransportError {
    TransportError::new(err.to_string())
}
