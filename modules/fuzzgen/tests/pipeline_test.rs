//! End-to-end pipeline tests against the mock transport.
//! No network: every source is served by MockSourceClient.

use std::collections::BTreeMap;
use std::sync::Arc;

use fuzzgen::testing::MockSourceClient;
use fuzzgen::{
    export, normalize_line, parse_sources, Category, ExportFormat, FailureStage, Pipeline,
    PipelineConfig, StoreBackend,
};

fn small_batches() -> PipelineConfig {
    PipelineConfig {
        batch_size: 3,
        tokens_per_message: 2,
        channel_capacity: 2,
        ..PipelineConfig::default()
    }
}

fn exported(output: &fuzzgen::RunOutput) -> String {
    let mut out = Vec::new();
    export(&output.store, &mut out, ExportFormat::Tokens).unwrap();
    String::from_utf8(out).unwrap()
}

// ---------------------------------------------------------------------------
// Failure isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_survivor_out_of_three_still_yields_its_tokens() {
    let registry = parse_sources(
        r#"
        subdomains = [
            "https://dead.test/subs.txt",
            "https://broken.test/subs.txt",
            "https://ok.test/subs.txt",
        ]
        "#,
    )
    .unwrap();

    let client = MockSourceClient::new()
        .failing_probe("https://dead.test/subs.txt", 404)
        .failing_fetch("https://broken.test/subs.txt", 500)
        .on_body("https://ok.test/subs.txt", "www\n*.API.\nmail\n");

    let output = Pipeline::new(Arc::new(client), small_batches())
        .run(&registry, Category::Subdomains)
        .await
        .unwrap();

    assert_eq!(exported(&output), "api\nmail\nwww\n");
    assert_eq!(output.stats.sources_valid, 2);
    assert_eq!(output.stats.sources_fetched, 1);
    assert_eq!(output.stats.sources_failed, 1);

    let stages: BTreeMap<_, _> = output
        .failures
        .iter()
        .map(|f| (f.url.as_str(), f.stage))
        .collect();
    assert_eq!(stages["https://dead.test/subs.txt"], FailureStage::Validation);
    assert_eq!(stages["https://broken.test/subs.txt"], FailureStage::Fetch);
}

#[tokio::test]
async fn newline_free_source_fails_alone() {
    let registry = parse_sources(
        r#"files = ["https://blob.test/f.txt", "https://ok.test/f.txt"]"#,
    )
    .unwrap();

    let blob = "x".repeat(16 * 1024);
    let mut chunks = vec!["index.php\n"];
    chunks.extend(std::iter::repeat(blob.as_str()).take(8));
    let client = MockSourceClient::new()
        .on_chunks("https://blob.test/f.txt", &chunks)
        .on_body("https://ok.test/f.txt", "robots.txt\n");

    let output = Pipeline::new(Arc::new(client), small_batches())
        .run(&registry, Category::Files)
        .await
        .unwrap();

    assert_eq!(exported(&output), "index.php\nrobots.txt\n");
    assert_eq!(output.stats.sources_failed, 1);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].url, "https://blob.test/f.txt");
    assert!(output.failures[0].error.contains("exceeds"));
}

#[tokio::test]
async fn truncated_stream_keeps_earlier_lines_and_other_sources() {
    let registry = parse_sources(
        r#"directories = ["https://flaky.test/d.txt", "https://ok.test/d.txt"]"#,
    )
    .unwrap();

    let client = MockSourceClient::new()
        .broken_stream("https://flaky.test/d.txt", "admin\nuploads\npart")
        .on_body("https://ok.test/d.txt", "images\n");

    let output = Pipeline::new(Arc::new(client), small_batches())
        .run(&registry, Category::Directories)
        .await
        .unwrap();

    assert_eq!(exported(&output), "admin\nimages\nuploads\n");
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].stage, FailureStage::Fetch);
}

// ---------------------------------------------------------------------------
// Deduplication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shared_line_produces_one_entry_from_one_of_its_sources() {
    let registry =
        parse_sources(r#"generic = ["https://a.test/g.txt", "https://b.test/g.txt"]"#).unwrap();

    let client = MockSourceClient::new()
        .on_body("https://a.test/g.txt", "login\n")
        .on_body("https://b.test/g.txt", "login\n");

    let output = Pipeline::new(Arc::new(client), small_batches())
        .run(&registry, Category::Generic)
        .await
        .unwrap();

    let entries: Vec<_> = output.store.iter().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "login");
    assert!(["https://a.test/g.txt", "https://b.test/g.txt"].contains(&entries[0].1));
}

#[tokio::test]
async fn store_matches_sequential_dedup_of_all_sources() {
    let bodies = [
        ("https://a.test/p.txt", "id\nPage\n  ID \nquery\n"),
        ("https://b.test/p.txt", "q\n?page=\nsort\n--\n"),
        ("https://c.test/p.txt", "SORT\nid\nlimit\noffset\nq\n"),
    ];

    let mut client = MockSourceClient::new();
    for (url, body) in bodies {
        client = client.on_chunks(url, &[&body[..5], &body[5..]]);
    }
    let urls: Vec<String> = bodies.iter().map(|(u, _)| u.to_string()).collect();
    let registry = fuzzgen::SourceRegistry::new([(Category::Parameters, urls)]);

    let output = Pipeline::new(Arc::new(client), small_batches())
        .run(&registry, Category::Parameters)
        .await
        .unwrap();

    let mut expected: Vec<String> = bodies
        .iter()
        .flat_map(|(_, body)| body.lines().filter_map(normalize_line))
        .collect();
    expected.sort();
    expected.dedup();

    let stored: Vec<String> = output.store.iter().map(|(t, _)| t.to_string()).collect();
    assert_eq!(stored, expected);
    assert_eq!(output.stats.tokens_offered, 12);
    assert_eq!(output.stats.entries_stored, 7);
    assert_eq!(output.store.backend().len(), 7);
}

#[tokio::test]
async fn large_source_spans_many_commits() {
    let body: String = (0..2500).map(|i| format!("word{i}\n")).collect();
    let registry = parse_sources(r#"files = ["https://big.test/f.txt"]"#).unwrap();
    let client = MockSourceClient::new().on_chunks("https://big.test/f.txt", &[body.as_str()]);

    let output = Pipeline::new(Arc::new(client), PipelineConfig::default())
        .run(&registry, Category::Files)
        .await
        .unwrap();

    assert_eq!(output.stats.entries_stored, 2500);
    // two full batches of 1000 plus the final partial one
    assert_eq!(output.stats.commits, 3);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[tokio::test]
async fn export_with_origin_attributes_each_entry() {
    let registry = parse_sources(r#"extensions = ["https://x.test/e.txt"]"#).unwrap();
    let client = MockSourceClient::new().on_body("https://x.test/e.txt", ".PHP\n.bak\n");

    let output = Pipeline::new(Arc::new(client), PipelineConfig::default())
        .run(&registry, Category::Extensions)
        .await
        .unwrap();

    let mut out = Vec::new();
    export(&output.store, &mut out, ExportFormat::WithOrigin).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "bak\thttps://x.test/e.txt\nphp\thttps://x.test/e.txt\n"
    );
}
