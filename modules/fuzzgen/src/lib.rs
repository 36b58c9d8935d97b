//! Wordlist aggregation for web fuzzing.
//!
//! Sources for a mode are validated with a HEAD probe, fetched concurrently,
//! normalized line by line and deduplicated into a key-ordered store through a
//! single writer task. The store is then exported one token per line.

pub mod category;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod stats;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod validator;
pub mod writer;

pub use category::Category;
pub use config::{load_sources, parse_sources, PipelineConfig, SourcesFile};
pub use error::{FuzzgenError, Result};
pub use export::{export, ExportFormat};
pub use normalize::{normalize_line, LineTooLong, Normalizer, MAX_LINE_LEN};
pub use pipeline::{FailureStage, Pipeline, RunOutput, SourceFailure};
pub use registry::SourceRegistry;
pub use stats::RunStats;
pub use store::{MemoryBackend, StoreBackend, TokenStore, WriteBatch};
pub use traits::{BodyStream, Transport};
pub use writer::{StoreWriter, TokenBatch, WriteStats};
