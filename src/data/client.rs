//! FOAF document client
//!
//! Downloads a user's FOAF document and parses the people out of it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::foaf::FoafDocument;
use super::Person;

/// Errors that can occur when fetching a FOAF document
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or HTTP-level failure; nothing was received
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Something came back but it isn't a FOAF document
    #[error("Malformed profile document: {0}")]
    MalformedDocument(String),
}

/// Where people records come from
///
/// Implemented by [`FoafClient`]; tests substitute in-memory sources.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetches the document at `url` and returns its people keyed by nick.
    async fn fetch(&self, url: &str) -> Result<HashMap<String, Person>, FetchError>;
}

/// HTTP client for LiveJournal FOAF documents
#[derive(Debug, Clone)]
pub struct FoafClient {
    http_client: Client,
}

impl Default for FoafClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FoafClient {
    /// Creates a new FoafClient with default settings
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
        }
    }

    /// Creates a FoafClient with a request timeout and user agent
    pub fn with_settings(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ProfileSource for FoafClient {
    /// Single attempt, no retries.
    ///
    /// A non-success status is reported as a malformed document: error pages
    /// are not FOAF, and they should be cached like any other unusable reply.
    async fn fetch(&self, url: &str) -> Result<HashMap<String, Person>, FetchError> {
        debug!(url, "fetching FOAF document");
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::MalformedDocument(format!("HTTP status {status}")));
        }

        let doc = FoafDocument::parse(&text)
            .map_err(|e| FetchError::MalformedDocument(e.to_string()))?;
        Ok(doc.people_by_nick())
    }
}
