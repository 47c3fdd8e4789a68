//! Transport to the document submission endpoint.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// A successful response from the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

/// Failure of a downstream call.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request never produced a response (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Sends an opaque payload to the one endpoint this client talks to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `payload` and return the endpoint's response.
    async fn send(&self, payload: Vec<u8>) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, payload: Vec<u8>) -> Result<Response, TransportError> {
        (**self).send(payload).await
    }
}
