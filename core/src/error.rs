//! Error types for the request dispatcher.
//!
//! # Design
//! A non-2xx status is the ordinary failure path and displays as nothing but
//! the response's status text, so callers can surface it verbatim. A JSON body
//! that fails to parse under a JSON content type settles as `InvalidJson`
//! instead of escaping as a panic.

use thiserror::Error;

/// Failure raised by a `Transport` before a final status was known
/// (connection refused, reset mid-body, invalid URL).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors a dispatched request settles with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The final status code was outside 200-299.
    #[error("{status_text}")]
    Status { status: u16, status_text: String },

    /// The response declared `application/json` but the body did not parse.
    #[error("invalid JSON response: {0}")]
    InvalidJson(String),

    /// The request body could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The request descriptor was rejected before anything was sent.
    #[error("invalid request descriptor: {0}")]
    InvalidDescriptor(String),

    /// The transport gave up before the transaction reached its terminal state.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
}

impl ApiError {
    /// HTTP status carried by the error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
