//! GLS HTTP Client
//!
//! A thin, typed HTTP client for the remote pipelines API and the object
//! store that backs the run's working directory.
//!
//! The client knows the wire format and nothing else: translating a
//! [`JobDescription`](gls_core::domain::job::JobDescription) into a request is
//! done by [`run_request`], and reading a poll result out of an operation by
//! [`poll_response`].
//!
//! # Example
//!
//! ```no_run
//! use gls_client::LifeSciencesClient;
//!
//! #[tokio::main]
//! async fn main() -> gls_client::Result<()> {
//!     let client = LifeSciencesClient::new(
//!         "https://lifesciences.googleapis.com",
//!         "https://storage.googleapis.com",
//!     )
//!     .with_token("ya29.token");
//!
//!     let op = client
//!         .get_operation("projects/p1/locations/us-central1/operations/42")
//!         .await?;
//!     println!("done: {}", op.done);
//!     Ok(())
//! }
//! ```

pub mod error;
mod pipelines;
mod request;
mod status;
mod storage;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use request::{BIN_MOUNT, WORK_MOUNT, run_request};
pub use status::poll_response;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default endpoint of the pipelines API
pub const DEFAULT_API_URL: &str = "https://lifesciences.googleapis.com";

/// Default endpoint of the object store
pub const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com";

/// HTTP client for the pipelines API and object store
///
/// Methods are organized into logical groups:
/// - Pipeline operations (run, get, cancel)
/// - Object uploads
#[derive(Debug, Clone)]
pub struct LifeSciencesClient {
    /// Base URL of the pipelines API
    api_url: String,
    /// Base URL of the object store
    storage_url: String,
    /// OAuth bearer token attached to every request
    token: Option<String>,
    /// HTTP client instance
    client: Client,
}

impl LifeSciencesClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_url` - Base URL of the pipelines API
    /// * `storage_url` - Base URL of the object store
    pub fn new(api_url: impl Into<String>, storage_url: impl Into<String>) -> Self {
        Self::with_client(api_url, storage_url, Client::new())
    }

    /// Create a new client whose requests give up after `timeout`
    pub fn with_timeout(
        api_url: impl Into<String>,
        storage_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(api_url, storage_url, client))
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        api_url: impl Into<String>,
        storage_url: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            storage_url: storage_url.into().trim_end_matches('/').to_string(),
            token: None,
            client,
        }
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the base URL of the pipelines API
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Get the base URL of the object store
    pub fn storage_url(&self) -> &str {
        &self.storage_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response whose body is not needed
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = LifeSciencesClient::new(DEFAULT_API_URL, DEFAULT_STORAGE_URL);
        assert_eq!(client.api_url(), "https://lifesciences.googleapis.com");
        assert_eq!(client.storage_url(), "https://storage.googleapis.com");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = LifeSciencesClient::new("http://localhost:8080/", "http://localhost:9090/");
        assert_eq!(client.api_url(), "http://localhost:8080");
        assert_eq!(client.storage_url(), "http://localhost:9090");
    }

    #[test]
    fn test_client_with_timeout() {
        let client = LifeSciencesClient::with_timeout(
            DEFAULT_API_URL,
            DEFAULT_STORAGE_URL,
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(client.api_url(), DEFAULT_API_URL);
    }

    #[test]
    fn test_client_with_token() {
        let client = LifeSciencesClient::new(DEFAULT_API_URL, DEFAULT_STORAGE_URL).with_token("abc");
        assert_eq!(client.token.as_deref(), Some("abc"));
    }
}
