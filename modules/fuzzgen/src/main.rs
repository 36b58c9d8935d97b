use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fuzzgen::{export, load_sources, Category, ExportFormat, Pipeline, PipelineConfig};
use source_client::SourceClient;

#[derive(Parser)]
#[command(
    name = "fuzzgen",
    about = "Generate wordlists for web fuzzing",
    long_about = "Fetches every source listed for a mode, normalizes and deduplicates the \
                  entries, and writes one sorted wordlist.\n\n\
                  Modes: generic (g), directories (d), files (f), parameters (p), \
                  extensions (e), subdomains (s)"
)]
struct Cli {
    /// Wordlist mode
    #[arg(short, long, default_value = "generic")]
    mode: Category,

    /// Path to the sources TOML file
    #[arg(short, long, env = "FUZZGEN_SOURCES", default_value = "sources.toml")]
    sources: PathBuf,

    /// Output file; `-` for stdout. Defaults to `<mode>.txt`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Max sources probed or fetched at once
    #[arg(long, default_value_t = 16)]
    concurrency: usize,

    /// Inserted entries per store commit
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Append the origin URL to every line (tab separated)
    #[arg(long)]
    with_origin: bool,

    /// Log as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so stdout can carry the wordlist
    let filter = EnvFilter::from_default_env().add_directive("fuzzgen=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(mode = %cli.mode, sources = %cli.sources.display(), "fuzzgen starting");

    let registry = load_sources(&cli.sources)?;

    let client = SourceClient::new(Duration::from_secs(cli.timeout_secs))
        .context("Failed to build HTTP client")?;
    let pipeline = Pipeline::new(
        Arc::new(client),
        PipelineConfig {
            concurrency: cli.concurrency,
            batch_size: cli.batch_size,
            ..PipelineConfig::default()
        },
    );

    let output = pipeline.run(&registry, cli.mode).await?;
    info!("{}", output.stats);
    if !output.failures.is_empty() {
        warn!(count = output.failures.len(), "Some sources were skipped");
    }

    let format = if cli.with_origin {
        ExportFormat::WithOrigin
    } else {
        ExportFormat::Tokens
    };
    let path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(cli.mode.default_output()));

    if path == Path::new("-") {
        let written = export(&output.store, io::stdout().lock(), format)?;
        info!(entries = written, "Generated wordlist written to stdout");
    } else {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        let written = export(&output.store, file, format)?;
        info!(entries = written, path = %path.display(), "Generated wordlist saved");
    }

    Ok(())
}
