//! Rate-limited document client.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, trace};

use crate::config::GuardConfig;
use crate::document::Document;
use crate::error::{GuardError, Result};
use crate::ratelimit::{Permit, RateLimiter};
use crate::transport::{HttpTransport, Response, Transport};

/// Client that admits every request through a shared [`RateLimiter`]
/// before handing it to the transport.
///
/// Clones share both the limiter and the transport. Admission is the only
/// serialized step; permitted requests run concurrently.
pub struct DocumentClient<T: Transport> {
    /// The rate limiter instance
    limiter: Arc<RateLimiter>,
    /// Downstream transport
    transport: Arc<T>,
}

impl<T: Transport> Clone for DocumentClient<T> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl DocumentClient<HttpTransport> {
    /// Build a client over HTTP from configuration.
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        let limiter = RateLimiter::new(config.limiter.to_limiter_config()?)?;
        let transport = HttpTransport::new(&config.transport)?;
        Ok(Self::new(Arc::new(limiter), transport))
    }
}

impl<T: Transport> DocumentClient<T> {
    /// Create a client over an existing limiter.
    pub fn new(limiter: Arc<RateLimiter>, transport: T) -> Self {
        Self {
            limiter,
            transport: Arc::new(transport),
        }
    }

    /// The limiter this client admits through.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Serialize `document` and submit it.
    ///
    /// Serialization happens before admission, so a document that cannot be
    /// encoded never consumes a slot.
    pub async fn create_document(&self, document: &Document) -> Result<Response> {
        let payload = document.to_payload()?;
        debug!(doc_id = %document.doc_id, doc_type = %document.doc_type, "Creating document");
        self.submit(payload).await
    }

    /// Acquire admission, then send `payload`.
    pub async fn submit(&self, payload: Vec<u8>) -> Result<Response> {
        let permit = self.limiter.acquire().await?;
        self.send_admitted(permit, payload).await
    }

    /// Like [`submit`](Self::submit), but a blocking admission wait is
    /// abandoned once `cancel` resolves.
    pub async fn submit_with_cancel<F>(&self, payload: Vec<u8>, cancel: F) -> Result<Response>
    where
        F: Future<Output = ()>,
    {
        let permit = self.limiter.acquire_with_cancel(cancel).await?;
        self.send_admitted(permit, payload).await
    }

    /// The permit is spent whether or not the send succeeds.
    async fn send_admitted(&self, permit: Permit, payload: Vec<u8>) -> Result<Response> {
        trace!(
            sequence = permit.sequence(),
            bytes = payload.len(),
            "Admitted, sending payload"
        );

        self.transport.send(payload).await.map_err(|e| {
            error!(error = %e, sequence = permit.sequence(), "Document submission failed");
            GuardError::Transport(e)
        })
    }
}
