// Single writer task in front of the TokenStore.
//
// Fetch tasks send TokenBatch messages over a bounded channel; this task is the
// only code that touches the store until the channel closes, then it commits
// the final partial batch and hands the store back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::{FuzzgenError, Result};
use crate::store::{StoreBackend, TokenStore};

/// Tokens from one source, in that source's line order.
#[derive(Debug, Clone)]
pub struct TokenBatch {
    pub origin: Arc<str>,
    pub tokens: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct WriteStats {
    /// Tokens received, duplicates included.
    pub offered: usize,
    /// Tokens that became new entries.
    pub inserted: usize,
    pub commits: usize,
    /// New entries per origin URL.
    pub inserted_by_origin: HashMap<Arc<str>, usize>,
}

pub struct StoreWriter<B: StoreBackend> {
    store: TokenStore<B>,
    stats: WriteStats,
    commit_attempts: u32,
    commit_retry_base: Duration,
}

impl<B: StoreBackend + 'static> StoreWriter<B> {
    pub fn new(store: TokenStore<B>, config: &PipelineConfig) -> Self {
        Self {
            store,
            stats: WriteStats::default(),
            commit_attempts: config.commit_attempts.max(1),
            commit_retry_base: config.commit_retry_base,
        }
    }

    /// Spawn the writer. Drop every sender clone to let it finish.
    pub fn spawn(
        self,
        capacity: usize,
    ) -> (
        mpsc::Sender<TokenBatch>,
        JoinHandle<Result<(TokenStore<B>, WriteStats)>>,
    ) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(self.run(rx));
        (tx, handle)
    }

    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<TokenBatch>,
    ) -> Result<(TokenStore<B>, WriteStats)> {
        while let Some(batch) = rx.recv().await {
            self.stats.offered += batch.tokens.len();
            let mut inserted = 0;

            for token in batch.tokens {
                if self.store.put_if_absent(token, &batch.origin) {
                    inserted += 1;
                }
                if self.store.is_batch_full() {
                    self.commit().await?;
                }
            }

            if inserted > 0 {
                self.stats.inserted += inserted;
                *self
                    .stats
                    .inserted_by_origin
                    .entry(batch.origin.clone())
                    .or_default() += inserted;
            }
        }

        self.commit().await?;
        self.stats.commits = self.store.commits();
        debug!(
            offered = self.stats.offered,
            inserted = self.stats.inserted,
            commits = self.stats.commits,
            "Store writer drained"
        );

        Ok((self.store, self.stats))
    }

    async fn commit(&mut self) -> Result<()> {
        let mut backoff = self.commit_retry_base;

        for attempt in 1..=self.commit_attempts {
            match self.store.commit() {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.commit_attempts => {
                    warn!(
                        attempt,
                        pending = self.store.pending_len(),
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Store commit failed, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    return Err(FuzzgenError::StoreCommit {
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
