// Network seam for the pipeline.
//
// Transport covers the two requests a source ever sees: a HEAD probe during
// validation and a streaming GET during fetch. The real implementation is
// source_client::SourceClient; tests use testing::MockSourceClient.

use async_trait::async_trait;
use bytes::Bytes;
use source_client::{SourceBody, SourceClient, SourceClientError};

type ClientResult<T> = std::result::Result<T, SourceClientError>;

/// A response body read chunk by chunk. Dropping it releases the connection.
#[async_trait]
pub trait BodyStream: Send {
    /// Next chunk, or `None` at end of body.
    async fn next_chunk(&mut self) -> ClientResult<Option<Bytes>>;
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Lightweight existence check. `Ok` carries the 2xx status.
    async fn probe(&self, url: &str) -> ClientResult<u16>;

    /// Start a full retrieval. Non-2xx answers are errors.
    async fn open(&self, url: &str) -> ClientResult<Box<dyn BodyStream>>;
}

#[async_trait]
impl BodyStream for SourceBody {
    async fn next_chunk(&mut self) -> ClientResult<Option<Bytes>> {
        self.chunk().await
    }
}

#[async_trait]
impl Transport for SourceClient {
    async fn probe(&self, url: &str) -> ClientResult<u16> {
        Ok(self.head(url).await?.as_u16())
    }

    async fn open(&self, url: &str) -> ClientResult<Box<dyn BodyStream>> {
        let body = self.get(url).await?;
        Ok(Box::new(body))
    }
}
