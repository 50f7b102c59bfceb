//! One request from descriptor to settled result, without I/O.
//!
//! # Design
//! `Exchange::open` turns a descriptor into an `HttpRequest` and, when a comet
//! callback is present, arms a polling cursor. The owner of the socket sends
//! the request, calls `tick` on its own timer while the body streams in, and
//! finally hands the complete response to `settle`. `settle` takes `self` by
//! value, so an exchange settles exactly once and can no longer be ticked
//! afterwards.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::comet::CometCursor;
use crate::descriptor::{CometCallback, RequestDescriptor};
use crate::encode::{assemble_headers, encode_body, APPLICATION_JSON, CONTENT_TYPE};
use crate::error::ApiError;
use crate::http::{find_header, Credentials, HttpMethod, HttpRequest, HttpResponse};

/// A request that reached its terminal state with a 2xx status.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRequest {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Parsed body, present when the response `Content-Type` is exactly
    /// `application/json`.
    pub json: Option<Value>,
    /// Text received after the last polling tick, present in comet mode.
    pub comet_tail: Option<String>,
}

impl CompletedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

struct CometPoll {
    callback: CometCallback,
    cursor: CometCursor,
    rate: Duration,
}

pub struct Exchange {
    request: HttpRequest,
    comet: Option<CometPoll>,
}

impl Exchange {
    pub fn open(descriptor: impl Into<RequestDescriptor>) -> Result<Self, ApiError> {
        let options = descriptor.into().into_options();
        let poll_rate = options.poll_rate();

        let method = HttpMethod::parse(options.method.as_deref().unwrap_or("GET"))?;
        let async_mode = async_mode(options.async_mode);
        let credentials = options.user.map(|user| Credentials {
            user,
            password: options.password,
        });
        let headers = assemble_headers(options.headers, options.content_type.as_deref());
        let body = encode_body(options.data, &headers)?;

        let comet = options.comet.map(|callback| CometPoll {
            callback,
            cursor: CometCursor::new(),
            rate: poll_rate,
        });

        debug!(
            method = %method,
            url = %options.url,
            comet = comet.is_some(),
            "opening request"
        );

        Ok(Self {
            request: HttpRequest {
                method,
                url: options.url,
                headers,
                body,
                async_mode,
                credentials,
            },
            comet,
        })
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Polling interval, if the exchange runs in comet mode.
    pub fn poll_rate(&self) -> Option<Duration> {
        self.comet.as_ref().map(|poll| poll.rate)
    }

    /// Run one polling tick against the partial response text. Returns
    /// `true` when the callback was invoked.
    pub fn tick(&mut self, partial: &str) -> bool {
        let Some(poll) = self.comet.as_mut() else {
            return false;
        };
        match poll.cursor.advance(partial) {
            Some(line) => {
                trace!(url = %self.request.url, line = %line, "comet line");
                (poll.callback)(&line);
                true
            }
            None => false,
        }
    }

    /// Settle with the final response. The polling cursor is dropped here.
    pub fn settle(self, response: HttpResponse) -> Result<CompletedRequest, ApiError> {
        let comet_tail = self
            .comet
            .map(|poll| poll.cursor.tail(&response.body).to_string());

        debug!(
            method = %self.request.method,
            url = %self.request.url,
            status = response.status,
            "request settled"
        );

        if !(200..=299).contains(&response.status) {
            return Err(ApiError::Status {
                status: response.status,
                status_text: response.status_text,
            });
        }

        let json = if response.header(CONTENT_TYPE) == Some(APPLICATION_JSON) {
            let value = serde_json::from_str(&response.body)
                .map_err(|e| ApiError::InvalidJson(e.to_string()))?;
            Some(value)
        } else {
            None
        };

        Ok(CompletedRequest {
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: response.body,
            json,
            comet_tail,
        })
    }
}

/// Every request runs asynchronously. An explicit `false` has never turned
/// on blocking mode and still does not.
fn async_mode(requested: Option<bool>) -> bool {
    if requested == Some(false) {
        warn!("async: false is ignored; the request runs asynchronously");
    }
    true
}
