use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{FuzzgenError, Result};
use crate::normalize::Normalizer;
use crate::traits::Transport;
use crate::writer::TokenBatch;

/// What one source contributed to the writer queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub url: String,
    pub lines: u64,
    pub tokens: usize,
    pub bytes: u64,
}

/// Stream one source through the normalizer into the writer queue.
///
/// Tokens are sent in line order, `tokens_per_message` at a time. A read error
/// or an over-long line part-way through still delivers everything read
/// before it, then fails the source. The body is dropped (and its connection released) on every return.
pub async fn fetch_source(
    transport: &dyn Transport,
    url: &str,
    tx: &mpsc::Sender<TokenBatch>,
    tokens_per_message: usize,
) -> Result<SourceReport> {
    let mut body = transport
        .open(url)
        .await
        .map_err(|source| FuzzgenError::Source {
            url: url.to_string(),
            source,
        })?;

    let origin: Arc<str> = Arc::from(url);
    let limit = tokens_per_message.max(1);
    let mut normalizer = Normalizer::new();
    let mut pending: Vec<String> = Vec::with_capacity(limit);
    let mut sent = 0usize;
    let mut bytes = 0u64;

    loop {
        match body.next_chunk().await {
            Ok(Some(chunk)) => {
                bytes += chunk.len() as u64;
                let mut overflow = None;
                for token in normalizer.push(&chunk) {
                    match token {
                        Ok(token) => pending.push(token),
                        Err(e) => {
                            overflow = Some(e);
                            break;
                        }
                    }
                }
                if let Some(source) = overflow {
                    sent += send(tx, &origin, &mut pending).await?;
                    return Err(FuzzgenError::LineTooLong {
                        url: url.to_string(),
                        tokens: sent,
                        source,
                    });
                }
                if pending.len() >= limit {
                    sent += send(tx, &origin, &mut pending).await?;
                }
            }
            Ok(None) => break,
            Err(source) => {
                sent += send(tx, &origin, &mut pending).await?;
                return Err(FuzzgenError::Read {
                    url: url.to_string(),
                    tokens: sent,
                    source,
                });
            }
        }
    }

    pending.extend(normalizer.finish());
    let lines = normalizer.lines();
    sent += send(tx, &origin, &mut pending).await?;

    debug!(url, lines, tokens = sent, bytes, "Source drained");

    Ok(SourceReport {
        url: url.to_string(),
        lines,
        tokens: sent,
        bytes,
    })
}

async fn send(
    tx: &mpsc::Sender<TokenBatch>,
    origin: &Arc<str>,
    pending: &mut Vec<String>,
) -> Result<usize> {
    if pending.is_empty() {
        return Ok(0);
    }
    let tokens = std::mem::take(pending);
    let count = tokens.len();
    tx.send(TokenBatch {
        origin: origin.clone(),
        tokens,
    })
    .await
    .map_err(|_| FuzzgenError::WriterClosed)?;
    Ok(count)
}
