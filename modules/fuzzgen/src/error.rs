use source_client::SourceClientError;

use crate::category::Category;
use crate::normalize::LineTooLong;

/// Result type alias for wordlist generation.
pub type Result<T> = std::result::Result<T, FuzzgenError>;

#[derive(Debug, thiserror::Error)]
pub enum FuzzgenError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid mode: {0} (supported modes are: generic, directories, files, parameters, extensions, subdomains)")]
    UnknownCategory(String),

    #[error("No URLs found for mode: {0}")]
    NoSources(Category),

    #[error("None of the {checked} sources for mode {category} are reachable")]
    NoReachableSources { category: Category, checked: usize },

    #[error("Source {url} failed: {source}")]
    Source {
        url: String,
        source: SourceClientError,
    },

    #[error("Reading {url} failed after {tokens} tokens: {source}")]
    Read {
        url: String,
        tokens: usize,
        source: SourceClientError,
    },

    #[error("Reading {url} failed after {tokens} tokens: {source}")]
    LineTooLong {
        url: String,
        tokens: usize,
        source: LineTooLong,
    },

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store commit failed after {attempts} attempts: {reason}")]
    StoreCommit { attempts: u32, reason: String },

    #[error("Store writer stopped before all tokens were written")]
    WriterClosed,

    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
