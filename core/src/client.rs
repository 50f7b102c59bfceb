//! Async request dispatcher over a pluggable `Transport`.
//!
//! # Design
//! `Dispatcher` holds only its transport and carries no state between calls.
//! Each `dispatch` opens an `Exchange`, races the transport's send future
//! against a polling interval (comet mode only), and settles the exchange once
//! the send future resolves. The select is biased towards completion and the
//! interval is dropped before settling, so no tick is ever observed after the
//! terminal state.

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::descriptor::RequestDescriptor;
use crate::error::ApiError;
use crate::exchange::{CompletedRequest, Exchange};
use crate::http::HttpResponse;
use crate::transport::{ResponseBuffer, ResponseHead, Transport};

#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Issue one request and wait for its terminal state.
    pub async fn dispatch(
        &self,
        descriptor: impl Into<RequestDescriptor>,
    ) -> Result<CompletedRequest, ApiError> {
        dispatch(&self.transport, descriptor).await
    }
}

/// Issue one request over `transport` and wait for its terminal state.
pub async fn dispatch<T: Transport>(
    transport: &T,
    descriptor: impl Into<RequestDescriptor>,
) -> Result<CompletedRequest, ApiError> {
    let mut exchange = Exchange::open(descriptor)?;
    let buffer = ResponseBuffer::new();
    let send = transport.send(exchange.request().clone(), buffer.clone());

    let head: ResponseHead = match exchange.poll_rate() {
        None => send.await?,
        Some(rate) => {
            tokio::pin!(send);
            let mut ticker = time::interval_at(Instant::now() + rate, rate);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let head = loop {
                tokio::select! {
                    biased;
                    head = &mut send => break head,
                    _ = ticker.tick() => {
                        exchange.tick(&buffer.partial_text());
                    }
                }
            };
            drop(ticker);
            head?
        }
    };

    debug!(status = head.status, bytes = buffer.len(), "transaction complete");
    exchange.settle(HttpResponse {
        status: head.status,
        status_text: head.status_text,
        headers: head.headers,
        body: buffer.text(),
    })
}
