use futures::stream::{self, StreamExt};
use source_client::SourceClientError;
use tracing::{info, warn};

use crate::traits::Transport;

/// Outcome of probing a category's sources.
#[derive(Debug, Default)]
pub struct Validation {
    /// Reachable sources, in input order.
    pub valid: Vec<String>,
    pub dropped: Vec<(String, SourceClientError)>,
}

/// Probe every URL (at most `concurrency` at once) and keep those answering 2xx.
/// Unreachable sources are reported and dropped; dropping all of them is not
/// an error here.
pub async fn validate_sources(
    transport: &dyn Transport,
    urls: &[String],
    concurrency: usize,
) -> Validation {
    info!(count = urls.len(), "Checking sources...");

    let probes: Vec<_> = stream::iter(urls.iter().map(|url| async move {
        (url, transport.probe(url).await)
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    let mut validation = Validation::default();
    for (url, result) in probes {
        match result {
            Ok(status) => {
                info!(url = url.as_str(), status, "Valid source");
                validation.valid.push(url.clone());
            }
            Err(e) => {
                warn!(url = url.as_str(), error = %e, "Dropping unreachable source");
                validation.dropped.push((url.clone(), e));
            }
        }
    }

    validation
}
