//! HTTP transport implementation.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use super::{Response, Transport, TransportError};
use crate::config::TransportSettings;
use crate::error::{GuardError, Result};

/// Posts JSON payloads to a fixed endpoint.
pub struct HttpTransport {
    /// Shared connection pool
    client: Client,
    /// Document creation endpoint
    endpoint: Url,
    /// Bearer token, if the endpoint needs one
    auth_token: Option<String>,
}

impl HttpTransport {
    /// Create a transport from settings.
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        let endpoint = Url::parse(&settings.endpoint).map_err(|e| {
            GuardError::Config(format!("Invalid endpoint {}: {}", settings.endpoint, e))
        })?;

        let mut builder = Client::builder().timeout(settings.timeout());
        if !settings.use_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| GuardError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            auth_token: settings.auth_token.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: Vec<u8>) -> std::result::Result<Response, TransportError> {
        debug!(endpoint = %self.endpoint, bytes = payload.len(), "Sending payload");

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Endpoint rejected payload");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Response {
            status: status.as_u16(),
            body,
        })
    }
}
