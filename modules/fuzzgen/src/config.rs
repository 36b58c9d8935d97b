use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::category::Category;
use crate::error::{FuzzgenError, Result};
use crate::registry::SourceRegistry;

/// Sources file, one array of URLs per mode:
///
/// ```toml
/// subdomains = ["https://example.com/subdomains.txt"]
/// directories = ["https://example.com/dirs.txt"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesFile {
    pub generic: Vec<String>,
    pub directories: Vec<String>,
    pub files: Vec<String>,
    pub parameters: Vec<String>,
    pub extensions: Vec<String>,
    pub subdomains: Vec<String>,
}

impl SourcesFile {
    pub fn into_registry(self) -> SourceRegistry {
        SourceRegistry::new([
            (Category::Generic, self.generic),
            (Category::Directories, self.directories),
            (Category::Files, self.files),
            (Category::Parameters, self.parameters),
            (Category::Extensions, self.extensions),
            (Category::Subdomains, self.subdomains),
        ])
    }
}

/// Load and parse a TOML sources file.
pub fn load_sources(path: &Path) -> Result<SourceRegistry> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        FuzzgenError::Config(format!(
            "Failed to read sources file {}: {e}",
            path.display()
        ))
    })?;
    parse_sources(&content).map_err(|e| match e {
        FuzzgenError::Config(msg) => {
            FuzzgenError::Config(format!("{msg} (in {})", path.display()))
        }
        other => other,
    })
}

pub fn parse_sources(content: &str) -> Result<SourceRegistry> {
    let file: SourcesFile = toml::from_str(content)
        .map_err(|e| FuzzgenError::Config(format!("Failed to parse sources file: {e}")))?;
    Ok(file.into_registry())
}

/// Tuning knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Max sources probed or fetched at the same time.
    pub concurrency: usize,
    /// Inserted entries per store commit.
    pub batch_size: usize,
    /// Tokens a fetch accumulates before handing them to the writer.
    pub tokens_per_message: usize,
    /// Writer queue depth, in messages.
    pub channel_capacity: usize,
    pub commit_attempts: u32,
    /// Backoff before the second commit attempt; doubles afterwards.
    pub commit_retry_base: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 16,
            batch_size: 1000,
            tokens_per_message: 512,
            channel_capacity: 64,
            commit_attempts: 3,
            commit_retry_base: Duration::from_millis(200),
        }
    }
}
