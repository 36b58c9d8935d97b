pub mod error;

pub use error::{Result, SourceClientError};

use std::time::Duration;

use bytes::Bytes;
use reqwest::{StatusCode, Url};
use tracing::debug;

/// Browser identity sent with every request. Several list hosts refuse unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/111.0.0.0 Safari/537.36";

/// Per-request budget, covering connect, headers and body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SourceClient {
    client: reqwest::Client,
}

impl SourceClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_user_agent(timeout, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = client_builder(timeout, user_agent).build()?;
        Ok(Self { client })
    }

    /// HEAD the source and succeed only on a 2xx answer.
    pub async fn head(&self, url: &str) -> Result<StatusCode> {
        let parsed = parse_source_url(url)?;

        let resp = self.client.head(parsed).send().await?;
        let status = resp.status();
        debug!(url, status = status.as_u16(), "Probed source");

        if !status.is_success() {
            return Err(SourceClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(status)
    }

    /// GET the source and hand back its body unread. The caller pulls chunks
    /// off it; dropping the body releases the connection.
    pub async fn get(&self, url: &str) -> Result<SourceBody> {
        let parsed = parse_source_url(url)?;

        let resp = self.client.get(parsed).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(SourceClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        debug!(
            url,
            status = status.as_u16(),
            content_length = resp.content_length(),
            "Opened source body"
        );

        Ok(SourceBody { response: resp })
    }
}

/// Streaming response body of a source.
#[derive(Debug)]
pub struct SourceBody {
    response: reqwest::Response,
}

impl SourceBody {
    /// Next chunk of the body, or `None` once it is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.response.chunk().await?)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }
}

fn client_builder(timeout: Duration, user_agent: &str) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
}

/// Only http/https sources are fetched.
pub fn parse_source_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| SourceClientError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(SourceClientError::InvalidUrl {
            url: url.to_string(),
            reason: format!("only http/https URLs are allowed, got: {}", parsed.scheme()),
        });
    }

    Ok(parsed)
}
