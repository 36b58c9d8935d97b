use thiserror::Error;

pub type Result<T> = std::result::Result<T, SourceClientError>;

#[derive(Debug, Error)]
pub enum SourceClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl SourceClientError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceClientError::Timeout(err.to_string())
        } else {
            SourceClientError::Network(err.to_string())
        }
    }
}
