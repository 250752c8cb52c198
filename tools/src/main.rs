//! antifraud: classify streamed payments by social proximity.
//!
//! Usage:
//!   antifraud <batch> <stream> <output1> <output2> <output3>
//!             [--config FILE] [--workers N] [--summary-json FILE]
//!   antifraud generate --seed 12345 --people 1000 --txns 10000 --out FILE
//!             [--malformed 0.01]

use anyhow::{bail, Context, Result};
use antifraud_core::{
    classify::{ProximityClassifier, TrustPolicy},
    config::DetectorConfig,
    ingest::{load_graph, LoadStats, RecordSource, SourceKind},
    stream::{run_stream_parallel, FeatureSinks, StreamStats},
    synthetic::{PaymentGenerator, SyntheticSpec},
    PaymentGraph,
};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Flags that take a value; their values are not positional arguments.
const VALUE_FLAGS: &[&str] = &["--config", "--workers", "--summary-json"];

#[derive(serde::Serialize)]
struct RunSummary {
    finished_at: String,
    people: usize,
    relationships: usize,
    batch_loaded: u64,
    batch_skipped: u64,
    graph_seconds: f64,
    classified: u64,
    stream_malformed: u64,
    stream_seconds: f64,
    features: Vec<FeatureSummary>,
}

#[derive(serde::Serialize)]
struct FeatureSummary {
    name: String,
    max_hops: u32,
    trusted: u64,
    unverified: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let outcome = if args.first().map(String::as_str) == Some("generate") {
        generate(&args[1..])
    } else {
        detect(&args)
    };
    if let Err(e) = &outcome {
        log::error!("antifraud: run aborted: {e:#}");
    }
    outcome
}

fn detect(args: &[String]) -> Result<()> {
    let positional = positional_args(args);
    if positional.len() != 5 {
        bail!(
            "Expected exactly five inputs: \
             <batch> <stream> <output1> <output2> <output3>. Found: {}",
            positional.len()
        );
    }
    let (batch_path, stream_path, outputs) = (positional[0], positional[1], &positional[2..]);

    let mut config = match flag_value(args, "--config") {
        Some(path) => {
            log::info!("antifraud: loading config from {path}");
            DetectorConfig::load(path)?
        }
        None => DetectorConfig::default(),
    };
    config.workers = parse_arg(args, "--workers", config.workers);
    config.validate()?;
    if config.features.len() != outputs.len() {
        bail!(
            "config defines {} features but {} output files were given",
            config.features.len(),
            outputs.len()
        );
    }

    // Same setup order as always: graph, then stream, then outputs.
    let (graph, load_stats) = load_graph(batch_path)?;
    let stream = RecordSource::open(stream_path, SourceKind::Stream)?;
    let mut sinks = FeatureSinks::create(outputs)?;

    let policy = TrustPolicy::from_config(&config);
    let classifier = ProximityClassifier::new(&graph, &policy);
    let stats = run_stream_parallel(
        classifier,
        stream,
        &mut sinks,
        config.progress_interval,
        config.workers,
    )?;
    sinks.finish().context("flushing output files")?;

    let summary = build_summary(&config, &graph, &load_stats, &stats);
    log::info!(
        "antifraud: classified {} transactions against {} people",
        summary.classified,
        summary.people
    );
    print_summary(&summary);
    if let Some(path) = flag_value(args, "--summary-json") {
        let file =
            File::create(path).with_context(|| format!("Can't open file to write: {path}"))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &summary)?;
        writer.flush()?;
        log::info!("antifraud: summary written to {path}");
    }

    Ok(())
}

fn generate(args: &[String]) -> Result<()> {
    let seed = parse_arg(args, "--seed", 42u64);
    let spec = SyntheticSpec {
        people: parse_arg(args, "--people", 1_000u32),
        transactions: parse_arg(args, "--txns", 10_000u64),
        malformed_rate: parse_arg(args, "--malformed", 0.0f64),
    };
    let Some(out) = flag_value(args, "--out") else {
        bail!("generate requires --out FILE");
    };
    if !(0.0..=1.0).contains(&spec.malformed_rate) {
        bail!("--malformed must be between 0 and 1, got {}", spec.malformed_rate);
    }

    let file = File::create(out).with_context(|| format!("Can't open file to write: {out}"))?;
    let mut writer = BufWriter::new(file);
    PaymentGenerator::new(seed, spec).write_to(&mut writer)?;
    writer.flush()?;

    println!(
        "Wrote {} synthetic payments among {} people to {out} (seed {seed})",
        spec.transactions, spec.people
    );
    Ok(())
}

fn build_summary(
    config: &DetectorConfig,
    graph: &PaymentGraph,
    load: &LoadStats,
    stream: &StreamStats,
) -> RunSummary {
    let features = config
        .features
        .iter()
        .zip(&stream.trusted)
        .map(|(feature, &trusted)| FeatureSummary {
            name: feature.name.clone(),
            max_hops: feature.max_hops,
            trusted,
            unverified: stream.classified - trusted,
        })
        .collect();

    RunSummary {
        finished_at: chrono::Utc::now().to_rfc3339(),
        people: graph.vertex_count(),
        relationships: graph.edge_count(),
        batch_loaded: load.loaded,
        batch_skipped: load.skipped,
        graph_seconds: load.elapsed.as_secs_f64(),
        classified: stream.classified,
        stream_malformed: stream.malformed,
        stream_seconds: stream.elapsed.as_secs_f64(),
        features,
    }
}

fn print_summary(summary: &RunSummary) {
    println!("=== RUN SUMMARY ===");
    println!("  people:         {}", summary.people);
    println!("  relationships:  {}", summary.relationships);
    println!("  batch loaded:   {}", summary.batch_loaded);
    println!("  batch skipped:  {}", summary.batch_skipped);
    println!("  graph build:    {:.2}s", summary.graph_seconds);
    println!("  classified:     {}", summary.classified);
    println!("  malformed:      {}", summary.stream_malformed);
    println!("  stream time:    {:.2}s", summary.stream_seconds);
    println!();
    println!("=== FEATURES ===");
    for f in &summary.features {
        println!(
            "  {} (<= {} hops) | trusted: {} | unverified: {}",
            f.name, f.max_hops, f.trusted, f.unverified
        );
    }
}

fn positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else {
            positional.push(arg.as_str());
        }
    }
    positional
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
