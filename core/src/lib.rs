//! Promise-style HTTP request dispatcher with a comet (streaming) mode.
//!
//! # Overview
//! A caller describes one request (a bare URL or a `RequestOptions` record)
//! and receives a single settled result: the completed response on a 2xx
//! status, or an error carrying the status text otherwise. In comet mode a
//! polling reader delivers each newly completed line of a long-lived response
//! to a callback before the request finishes.
//!
//! # Design
//! - `Exchange` is the I/O-free state machine for one request: build the
//!   `HttpRequest`, tick the polling cursor, settle the response.
//! - `Transport` is the only I/O seam. `Dispatcher` drives an `Exchange` over
//!   a transport with a tokio interval as the polling timer.
//! - The FFI crate exposes `Exchange` directly so a C host can run its own
//!   network loop and timer.

pub mod client;
pub mod comet;
pub mod descriptor;
pub mod encode;
pub mod error;
pub mod exchange;
pub mod http;
pub mod transport;

pub use client::{dispatch, Dispatcher};
pub use comet::CometCursor;
pub use descriptor::{
    CometCallback, RequestBody, RequestDescriptor, RequestOptions, DEFAULT_COMET_POLL_RATE,
};
pub use error::{ApiError, TransportError};
pub use exchange::{CompletedRequest, Exchange};
pub use http::{Credentials, FormData, FormValue, HttpMethod, HttpRequest, HttpResponse, Payload};
pub use transport::{ResponseBuffer, ResponseHead, Transport};
