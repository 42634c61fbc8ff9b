//! Docket HTTP Client
//!
//! A type-safe HTTP client for the remote pipeline-processing service.
//!
//! Every request carries the bearer token of the current [`Session`]; when
//! the session has no token the call fails locally with
//! [`ClientError::Authentication`] before anything is sent. Responses are
//! decoded into permissive payloads and validated into domain values at this
//! boundary, so callers only ever see well-formed executions and batches.
//!
//! # Example
//!
//! ```no_run
//! use docket_client::{PipelineClient, SessionHandle};
//! use docket_core::dto::execution::SubmitExecution;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = SessionHandle::authenticated("token");
//!     let client = PipelineClient::new("http://localhost:8000", Arc::new(session));
//!
//!     let execution = client.submit_execution(&SubmitExecution {
//!         document_id: "doc-1".to_string(),
//!         pipeline_id: "pipe-A".to_string(),
//!         run_async: true,
//!         parameters: None,
//!     }).await?;
//!
//!     println!("Submitted execution: {}", execution.id);
//!     Ok(())
//! }
//! ```

mod batches;
mod configs;
pub mod error;
mod executions;
pub mod session;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use session::{AuthStatus, Session, SessionHandle};

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// HTTP client for the pipeline service API
///
/// Endpoints are organized into logical groups:
/// - Executions (submit, status, retry, cancel)
/// - Batches (submit, status, cancel)
/// - Pipeline configurations (list, create, update, delete)
#[derive(Clone)]
pub struct PipelineClient {
    /// Base URL of the service (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Supplies the bearer token for every request
    session: Arc<dyn Session>,
}

impl PipelineClient {
    /// Create a new pipeline service client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the service API
    /// * `session` - Source of the bearer token
    pub fn new(base_url: impl Into<String>, session: Arc<dyn Session>) -> Self {
        Self::with_client(base_url, Client::new(), session)
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        client: Client,
        session: Arc<dyn Session>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session,
        }
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    // =============================================================================
    // Request Helpers
    // =============================================================================

    /// Build an endpoint URL from path segments; each segment is percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::validation(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::validation("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the session's bearer token, or fail before any network activity
    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.session.token() {
            Some(token) if !token.is_empty() => Ok(request.bearer_auth(token)),
            _ => Err(ClientError::Authentication("no session token".to_string())),
        }
    }

    /// Authorize, send and decode a request
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorize(request)?.send().await?;
        self.handle_response(response).await
    }

    /// Authorize and send a request whose response body is ignored
    async fn execute_empty(&self, request: RequestBuilder) -> Result<()> {
        let response = self.authorize(request)?.send().await?;
        self.check_status(response).await.map(|_| ())
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;
        let body = response.text().await?;

        serde_json::from_str(&body)
            .map_err(|e| ClientError::Decode(format!("Failed to parse JSON response: {}", e)))
    }

    /// Map non-success statuses onto the error taxonomy
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = extract_error_message(&error_text);

        tracing::debug!(status = status.as_u16(), %message, "pipeline service returned an error");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Authentication(message));
        }
        Err(ClientError::remote(status.as_u16(), message))
    }
}

impl std::fmt::Debug for PipelineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Pull the human-readable message out of a structured error body
fn extract_error_message(body: &str) -> String {
    let structured = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|key| value.get(*key)?.as_str().map(str::to_string))
        });

    match structured {
        Some(message) => message,
        None if body.trim().is_empty() => "Unknown error".to_string(),
        None => body.trim().to_string(),
    }
}
