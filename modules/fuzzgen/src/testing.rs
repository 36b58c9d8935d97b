// Test doubles for the pipeline seams.
//
// - MockSourceClient (Transport): URL → canned probe/fetch behaviour
// - FailingBackend (StoreBackend): MemoryBackend whose commits can be made to fail

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use source_client::SourceClientError;

use crate::error::{FuzzgenError, Result};
use crate::store::{MemoryBackend, StoreBackend, WriteBatch};
use crate::traits::{BodyStream, Transport};

type ClientResult<T> = std::result::Result<T, SourceClientError>;

// ---------------------------------------------------------------------------
// MockSourceClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MockSource {
    Body(Vec<Bytes>),
    ProbeFails(u16),
    FetchFails(u16),
    /// Delivers the chunks, then fails the next read.
    Broken(Vec<Bytes>),
}

/// HashMap-based transport. Unregistered URLs fail with a network error.
/// Builder pattern: `.on_body()`, `.on_chunks()`, `.failing_probe()`,
/// `.failing_fetch()`, `.broken_stream()`.
#[derive(Default)]
pub struct MockSourceClient {
    sources: HashMap<String, MockSource>,
    probes: Mutex<HashMap<String, usize>>,
    opens: Mutex<HashMap<String, usize>>,
    dropped: Arc<Mutex<HashSet<String>>>,
}

impl MockSourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_body(self, url: &str, body: &str) -> Self {
        self.on_chunks(url, &[body])
    }

    pub fn on_chunks(mut self, url: &str, chunks: &[&str]) -> Self {
        self.sources
            .insert(url.to_string(), MockSource::Body(to_bytes(chunks)));
        self
    }

    pub fn failing_probe(mut self, url: &str, status: u16) -> Self {
        self.sources
            .insert(url.to_string(), MockSource::ProbeFails(status));
        self
    }

    /// Probe succeeds, full retrieval answers `status`.
    pub fn failing_fetch(mut self, url: &str, status: u16) -> Self {
        self.sources
            .insert(url.to_string(), MockSource::FetchFails(status));
        self
    }

    pub fn broken_stream(mut self, url: &str, before_failure: &str) -> Self {
        self.sources.insert(
            url.to_string(),
            MockSource::Broken(to_bytes(&[before_failure])),
        );
        self
    }

    pub fn probe_count(&self, url: &str) -> usize {
        count(&self.probes, url)
    }

    pub fn open_count(&self, url: &str) -> usize {
        count(&self.opens, url)
    }

    /// Whether a body opened for `url` has been dropped.
    pub fn body_dropped(&self, url: &str) -> bool {
        self.dropped.lock().unwrap().contains(url)
    }

    fn lookup(&self, url: &str) -> ClientResult<&MockSource> {
        self.sources
            .get(url)
            .ok_or_else(|| SourceClientError::Network(format!("connection refused: {url}")))
    }
}

#[async_trait]
impl Transport for MockSourceClient {
    async fn probe(&self, url: &str) -> ClientResult<u16> {
        bump(&self.probes, url);
        match self.lookup(url)? {
            MockSource::ProbeFails(status) => Err(status_error(url, *status)),
            _ => Ok(200),
        }
    }

    async fn open(&self, url: &str) -> ClientResult<Box<dyn BodyStream>> {
        bump(&self.opens, url);
        let (chunks, fail_at_end) = match self.lookup(url)? {
            MockSource::ProbeFails(status) | MockSource::FetchFails(status) => {
                return Err(status_error(url, *status));
            }
            MockSource::Body(chunks) => (chunks.clone(), false),
            MockSource::Broken(chunks) => (chunks.clone(), true),
        };

        Ok(Box::new(MockBody {
            url: url.to_string(),
            chunks: chunks.into(),
            fail_at_end,
            dropped: self.dropped.clone(),
        }))
    }
}

struct MockBody {
    url: String,
    chunks: VecDeque<Bytes>,
    fail_at_end: bool,
    dropped: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl BodyStream for MockBody {
    async fn next_chunk(&mut self) -> ClientResult<Option<Bytes>> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None if self.fail_at_end => Err(SourceClientError::Network(
                "connection reset by peer".to_string(),
            )),
            None => Ok(None),
        }
    }
}

impl Drop for MockBody {
    fn drop(&mut self) {
        if let Ok(mut dropped) = self.dropped.lock() {
            dropped.insert(self.url.clone());
        }
    }
}

fn to_bytes(chunks: &[&str]) -> Vec<Bytes> {
    chunks
        .iter()
        .map(|c| Bytes::copy_from_slice(c.as_bytes()))
        .collect()
}

fn status_error(url: &str, status: u16) -> SourceClientError {
    SourceClientError::Status {
        status,
        url: url.to_string(),
    }
}

fn bump(counter: &Mutex<HashMap<String, usize>>, url: &str) {
    *counter.lock().unwrap().entry(url.to_string()).or_default() += 1;
}

fn count(counter: &Mutex<HashMap<String, usize>>, url: &str) -> usize {
    counter.lock().unwrap().get(url).copied().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// FailingBackend
// ---------------------------------------------------------------------------

/// In-memory backend whose commits fail on demand.
#[derive(Debug)]
pub struct FailingBackend {
    inner: MemoryBackend,
    failures_left: Option<usize>,
    attempts: usize,
}

impl FailingBackend {
    /// Fail the first `n` commit calls, then behave normally.
    pub fn failing_first(n: usize) -> Self {
        Self {
            inner: MemoryBackend::default(),
            failures_left: Some(n),
            attempts: 0,
        }
    }

    /// Fail every commit.
    pub fn always() -> Self {
        Self {
            inner: MemoryBackend::default(),
            failures_left: None,
            attempts: 0,
        }
    }

    /// Commit calls seen, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl StoreBackend for FailingBackend {
    fn contains(&self, token: &str) -> bool {
        self.inner.contains(token)
    }

    fn commit(&mut self, batch: &WriteBatch) -> Result<()> {
        self.attempts += 1;
        match self.failures_left {
            None => return Err(FuzzgenError::Backend("disk full".to_string())),
            Some(n) if n > 0 => {
                self.failures_left = Some(n - 1);
                return Err(FuzzgenError::Backend("transaction conflict".to_string()));
            }
            Some(_) => {}
        }
        self.inner.commit(batch)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        self.inner.entries()
    }
}
