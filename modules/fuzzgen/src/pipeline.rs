// Registry → validate → fetch/normalize (concurrent) → single writer → store.
//
// Per-source failures are logged and collected in RunOutput::failures; only
// configuration problems, a category with no reachable source, and store
// commit failures abort the run.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::category::Category;
use crate::config::PipelineConfig;
use crate::error::{FuzzgenError, Result};
use crate::fetcher::fetch_source;
use crate::registry::SourceRegistry;
use crate::stats::RunStats;
use crate::store::{MemoryBackend, StoreBackend, TokenStore};
use crate::traits::Transport;
use crate::validator::validate_sources;
use crate::writer::StoreWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Validation,
    Fetch,
}

/// A source that contributed nothing, or less than its full body.
#[derive(Debug, Clone)]
pub struct SourceFailure {
    pub url: String,
    pub stage: FailureStage,
    pub error: String,
}

#[derive(Debug)]
pub struct RunOutput<B: StoreBackend = MemoryBackend> {
    pub store: TokenStore<B>,
    pub stats: RunStats,
    pub failures: Vec<SourceFailure>,
}

pub struct Pipeline {
    transport: Arc<dyn Transport>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>, config: PipelineConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the wordlist for `category` into an in-memory store.
    pub async fn run(&self, registry: &SourceRegistry, category: Category) -> Result<RunOutput> {
        self.run_with_backend(registry, category, MemoryBackend::default())
            .await
    }

    pub async fn run_with_backend<B: StoreBackend + 'static>(
        &self,
        registry: &SourceRegistry,
        category: Category,
        backend: B,
    ) -> Result<RunOutput<B>> {
        let mut stats = RunStats::new(category);
        let mut failures = Vec::new();

        let urls = registry.sources(category)?;
        stats.sources_configured = registry.urls(category).len();
        stats.sources_unique = urls.len();
        info!(
            category = %category,
            configured = stats.sources_configured,
            unique = stats.sources_unique,
            "Loaded sources"
        );

        // 1. Validation
        let validation =
            validate_sources(self.transport.as_ref(), &urls, self.config.concurrency).await;
        for (url, e) in validation.dropped {
            failures.push(SourceFailure {
                url,
                stage: FailureStage::Validation,
                error: e.to_string(),
            });
        }
        if validation.valid.is_empty() {
            return Err(FuzzgenError::NoReachableSources {
                category,
                checked: urls.len(),
            });
        }
        stats.sources_valid = validation.valid.len();
        info!(valid = stats.sources_valid, "Valid {category} sources");

        // 2. Fetch + normalize, one future per source, feeding one writer
        let store = TokenStore::new(backend, self.config.batch_size);
        let (tx, writer) =
            StoreWriter::new(store, &self.config).spawn(self.config.channel_capacity);

        let transport = self.transport.as_ref();
        let tokens_per_message = self.config.tokens_per_message;
        let outcomes: Vec<_> = stream::iter(validation.valid.iter().map(|url| {
            let tx = tx.clone();
            async move {
                let result = fetch_source(transport, url, &tx, tokens_per_message).await;
                (url, result)
            }
        }))
        .buffer_unordered(self.config.concurrency.max(1))
        .collect()
        .await;
        drop(tx);

        // 3. Writer result first: a commit failure explains any WriterClosed below
        let (store, write_stats) = writer
            .await
            .map_err(|e| anyhow::anyhow!("Store writer task failed: {e}"))??;

        for (url, result) in outcomes {
            match result {
                Ok(report) => {
                    stats.sources_fetched += 1;
                    let new_entries = write_stats
                        .inserted_by_origin
                        .get(url.as_str())
                        .copied()
                        .unwrap_or(0);
                    info!(
                        url = url.as_str(),
                        tokens = report.tokens,
                        new_entries,
                        lines = report.lines,
                        "Processed and stored content from source"
                    );
                }
                Err(e) => {
                    stats.sources_failed += 1;
                    warn!(url = url.as_str(), error = %e, "Source failed, skipping");
                    failures.push(SourceFailure {
                        url: url.clone(),
                        stage: FailureStage::Fetch,
                        error: e.to_string(),
                    });
                }
            }
        }

        stats.tokens_offered = write_stats.offered;
        stats.entries_stored = store.len();
        stats.commits = write_stats.commits;

        Ok(RunOutput {
            store,
            stats,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingBackend, MockSourceClient};

    fn registry(category: Category, urls: &[&str]) -> SourceRegistry {
        SourceRegistry::new([(category, urls.iter().map(|u| u.to_string()).collect())])
    }

    fn pipeline(client: MockSourceClient) -> Pipeline {
        Pipeline::new(
            Arc::new(client),
            PipelineConfig {
                batch_size: 2,
                tokens_per_message: 2,
                commit_retry_base: std::time::Duration::from_millis(1),
                ..PipelineConfig::default()
            },
        )
    }

    fn tokens(output: &RunOutput<impl StoreBackend>) -> Vec<String> {
        output.store.iter().map(|(t, _)| t.to_string()).collect()
    }

    #[tokio::test]
    async fn merges_and_deduplicates_sources() {
        let p = pipeline(
            MockSourceClient::new()
                .on_body("https://a.test/list", "Login\nadmin\n/backup/\n")
                .on_body("https://b.test/list", "LOGIN!\nconfig\nadmin\n"),
        );

        let output = p
            .run(
                &registry(Category::Directories, &["https://a.test/list", "https://b.test/list"]),
                Category::Directories,
            )
            .await
            .unwrap();

        assert_eq!(tokens(&output), vec!["admin", "backup", "config", "login"]);
        assert_eq!(output.stats.tokens_offered, 6);
        assert_eq!(output.stats.entries_stored, 4);
        assert_eq!(output.stats.duplicates(), 2);
        assert!(output.failures.is_empty());
    }

    #[tokio::test]
    async fn duplicate_urls_are_fetched_once() {
        let client = Arc::new(MockSourceClient::new().on_body("https://a.test/list", "x\n"));
        let p = Pipeline::new(client.clone(), PipelineConfig::default());

        let output = p
            .run(
                &registry(Category::Files, &["https://a.test/list", "https://a.test/list"]),
                Category::Files,
            )
            .await
            .unwrap();

        assert_eq!(client.probe_count("https://a.test/list"), 1);
        assert_eq!(client.open_count("https://a.test/list"), 1);
        assert_eq!(output.stats.sources_configured, 2);
        assert_eq!(output.stats.sources_unique, 1);
    }

    #[tokio::test]
    async fn no_reachable_source_aborts() {
        let p = pipeline(MockSourceClient::new().failing_probe("https://a.test/list", 503));

        let err = p
            .run(&registry(Category::Subdomains, &["https://a.test/list"]), Category::Subdomains)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FuzzgenError::NoReachableSources {
                category: Category::Subdomains,
                checked: 1
            }
        ));
    }

    #[tokio::test]
    async fn unconfigured_category_aborts_before_network() {
        let client = Arc::new(MockSourceClient::new());
        let p = Pipeline::new(client.clone(), PipelineConfig::default());

        let err = p
            .run(&registry(Category::Files, &["https://a.test/f"]), Category::Extensions)
            .await
            .unwrap_err();

        assert!(matches!(err, FuzzgenError::NoSources(Category::Extensions)));
        assert_eq!(client.probe_count("https://a.test/f"), 0);
    }

    #[tokio::test]
    async fn commit_failure_is_a_hard_error() {
        let p = pipeline(MockSourceClient::new().on_body("https://a.test/list", "a\nb\nc\nd\n"));

        let result = p
            .run_with_backend(
                &registry(Category::Generic, &["https://a.test/list"]),
                Category::Generic,
                FailingBackend::always(),
            )
            .await;

        assert!(matches!(result, Err(FuzzgenError::StoreCommit { .. })));
    }
}
