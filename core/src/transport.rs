//! The seam between the dispatcher and whatever performs network I/O.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::TransportError;
use crate::http::HttpRequest;

/// Status line and headers of a finished transaction. The body lives in the
/// `ResponseBuffer` the transport was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
}

/// Executes one request. Implementations append body bytes to `buffer` as
/// they arrive and resolve once the transaction is complete.
pub trait Transport {
    fn send(
        &self,
        request: HttpRequest,
        buffer: ResponseBuffer,
    ) -> impl Future<Output = Result<ResponseHead, TransportError>> + Send;
}

/// Append-only response body shared between a transport and the polling
/// reader. Cloning shares the same buffer.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, chunk: &[u8]) {
        self.lock().extend_from_slice(chunk);
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Decoded text received so far. Invalid bytes are replaced exactly as in
    /// `text`, but a multi-byte character still incomplete at the end of the
    /// buffer is left out until its remaining bytes arrive. The result is
    /// therefore always a prefix of the final `text`.
    pub fn partial_text(&self) -> String {
        let bytes = self.lock();
        let mut text = String::with_capacity(bytes.len());
        let mut chunks = bytes.utf8_chunks().peekable();
        while let Some(chunk) = chunks.next() {
            text.push_str(chunk.valid());
            let invalid = chunk.invalid();
            if invalid.is_empty() {
                continue;
            }
            if chunks.peek().is_none() && is_incomplete_sequence(invalid) {
                break;
            }
            text.push(char::REPLACEMENT_CHARACTER);
        }
        text
    }

    /// Full decoded body; invalid sequences are replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // The buffer only ever holds plain bytes, so a poisoned lock is
        // still consistent.
        self.bytes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A truncated but otherwise valid UTF-8 sequence, as opposed to bytes that
/// can never start a character.
fn is_incomplete_sequence(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_err_and(|e| e.error_len().is_none())
}
