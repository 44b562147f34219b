// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for reaching the remote.
//!
//! Provides a trait-based transport layer that enables:
//! - Real HTTP requests for production
//! - Mock transports for unit testing

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tally_core::Operation;

use crate::config::ClientConfig;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Client knows it is offline; nothing was sent.
    #[error("offline")]
    Offline,

    /// Transport could not be constructed.
    #[error("transport setup failed: {0}")]
    Setup(String),

    /// Request did not complete.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Response body was not a JSON result.
    #[error("undecodable response: {0}")]
    Decode(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A completed round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// 2xx response with the authoritative result.
    Accepted(Value),
    /// Non-2xx response. The operation is not retried.
    Rejected { status: u16, body: String },
}

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = TransportResult<T>> + Send + 'a>>;

/// Transport trait for the remote perform and health endpoints.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send + Sync {
    /// Sends one operation and waits for the remote's reply.
    fn perform<'a>(&'a self, operation: &'a Operation) -> TransportFuture<'a, Reply>;

    /// Probes the remote for liveness. Any response counts as alive.
    fn probe(&self) -> TransportFuture<'_, ()>;
}

/// HTTP transport implementation using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    perform_url: String,
    health_url: String,
}

impl HttpTransport {
    /// Create a transport for the endpoints named in `config`.
    pub fn new(config: &ClientConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(HttpTransport {
            client,
            perform_url: config.perform_url(),
            health_url: config.health_url(),
        })
    }

    pub fn perform_url(&self) -> &str {
        &self.perform_url
    }
}

impl Transport for HttpTransport {
    fn perform<'a>(&'a self, operation: &'a Operation) -> TransportFuture<'a, Reply> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.perform_url)
                .json(operation)
                .send()
                .await
                .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                // Body is informational only
                let body = response.text().await.unwrap_or_default();
                return Ok(Reply::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            let result = response
                .json::<Value>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))?;
            Ok(Reply::Accepted(result))
        })
    }

    fn probe(&self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.client
                .get(&self.health_url)
                .send()
                .await
                .map_err(|e| TransportError::RequestFailed(e.to_string()))?;
            Ok(())
        })
    }
}
