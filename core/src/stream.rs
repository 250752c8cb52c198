//! Stream pipeline — classify transactions in order and write one token line
//! per feature channel.
//!
//! RULES:
//!   - Output line N of every channel belongs to input transaction N.
//!   - A bad record never stops the stream; only I/O failures do.
//!   - Counters live in the returned StreamStats, never in globals.

use crate::{
    classify::{Classification, ProximityClassifier, Verdict},
    error::{DetectError, DetectResult},
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Lines handed to each worker per round in the parallel pipeline.
const LINES_PER_WORKER: usize = 1024;

// ── Output channels ──────────────────────────────────────────────────────────

/// One writer per feature, in feature order.
#[derive(Debug)]
pub struct FeatureSinks<W: Write> {
    writers: Vec<W>,
}

impl FeatureSinks<BufWriter<File>> {
    /// Create every output file up front. If any one fails, the files
    /// already opened are closed before the error is returned.
    pub fn create<P: AsRef<Path>>(paths: &[P]) -> DetectResult<Self> {
        let mut writers = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            match File::create(path) {
                Ok(file) => writers.push(BufWriter::new(file)),
                Err(source) => {
                    log::debug!(
                        "output: releasing {} already-opened channels",
                        writers.len()
                    );
                    drop(writers);
                    return Err(DetectError::OutputUnopenable {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
        Ok(Self { writers })
    }
}

impl<W: Write> FeatureSinks<W> {
    pub fn new(writers: Vec<W>) -> Self {
        Self { writers }
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    pub fn write(&mut self, verdict: &Verdict) -> io::Result<()> {
        for (writer, trust) in self.writers.iter_mut().zip(verdict.flags()) {
            writeln!(writer, "{trust}")?;
        }
        Ok(())
    }

    /// Flush every channel and hand the writers back.
    pub fn finish(mut self) -> io::Result<Vec<W>> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        Ok(self.writers)
    }
}

// ── Stats and progress ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub classified: u64,
    /// Stream lines whose ids could not be parsed.
    pub malformed: u64,
    /// Trusted count per feature, in feature order.
    pub trusted: Vec<u64>,
    pub elapsed: Duration,
}

impl StreamStats {
    fn new(features: usize) -> Self {
        Self {
            trusted: vec![0; features],
            ..Self::default()
        }
    }

    fn record(&mut self, classification: &Classification) {
        self.classified += 1;
        if classification.malformed {
            self.malformed += 1;
        }
        for (count, trust) in self.trusted.iter_mut().zip(classification.verdict.flags()) {
            if trust.is_trusted() {
                *count += 1;
            }
        }
    }
}

struct Progress {
    begin: Instant,
    interval: u64,
}

impl Progress {
    fn new(interval: u64) -> Self {
        Self {
            begin: Instant::now(),
            interval: interval.max(1),
        }
    }

    fn tick(&self, classified: u64) {
        if classified.is_multiple_of(self.interval) {
            self.report(classified);
        }
    }

    fn report(&self, classified: u64) {
        log::info!(
            "Classified {classified} transactions successfully. Time taken: {:.2}s",
            self.begin.elapsed().as_secs_f64()
        );
    }
}

// ── Pipelines ────────────────────────────────────────────────────────────────

/// Sequential reference pipeline.
pub fn run_stream<I, W>(
    classifier: ProximityClassifier<'_>,
    lines: I,
    sinks: &mut FeatureSinks<W>,
    progress_interval: u64,
) -> DetectResult<StreamStats>
where
    I: IntoIterator<Item = io::Result<String>>,
    W: Write,
{
    check_channels(&classifier, sinks)?;
    log::info!("Begin to classify streaming transactions.");
    let progress = Progress::new(progress_interval);
    let mut stats = StreamStats::new(sinks.len());

    for line in lines {
        let classification = classifier.classify_line(&line?);
        emit(&classification, sinks, &mut stats, &progress)?;
    }

    finish(stats, &progress)
}

/// Fan-out/fan-in pipeline over `workers` threads sharing the graph.
/// Produces exactly the output of `run_stream`, including when a read
/// error stops the stream part-way.
pub fn run_stream_parallel<I, W>(
    classifier: ProximityClassifier<'_>,
    lines: I,
    sinks: &mut FeatureSinks<W>,
    progress_interval: u64,
    workers: usize,
) -> DetectResult<StreamStats>
where
    I: IntoIterator<Item = io::Result<String>>,
    W: Write,
{
    if workers <= 1 {
        return run_stream(classifier, lines, sinks, progress_interval);
    }
    check_channels(&classifier, sinks)?;
    log::info!("Begin to classify streaming transactions on {workers} workers.");
    let progress = Progress::new(progress_interval);
    let mut stats = StreamStats::new(sinks.len());

    let round = workers * LINES_PER_WORKER;
    let mut lines = lines.into_iter();
    let mut batch: Vec<String> = Vec::with_capacity(round);

    loop {
        batch.clear();
        let mut read_error = None;
        for line in lines.by_ref().take(round) {
            match line {
                Ok(line) => batch.push(line),
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
        }
        // Lines read before a failure are still emitted, as run_stream does.
        if !batch.is_empty() {
            for classification in classify_round(classifier, &batch, workers) {
                emit(&classification, sinks, &mut stats, &progress)?;
            }
        }
        if let Some(e) = read_error {
            return Err(e.into());
        }
        if batch.len() < round {
            break;
        }
    }

    finish(stats, &progress)
}

fn classify_round(
    classifier: ProximityClassifier<'_>,
    batch: &[String],
    workers: usize,
) -> Vec<Classification> {
    let per_worker = batch.len().div_ceil(workers);

    let mut indexed: Vec<(usize, Classification)> = thread::scope(|scope| {
        let handles: Vec<_> = batch
            .chunks(per_worker)
            .enumerate()
            .map(|(worker, slice)| {
                scope.spawn(move || {
                    slice
                        .iter()
                        .enumerate()
                        .map(|(i, line)| {
                            (worker * per_worker + i, classifier.classify_line(line))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, classification)| classification).collect()
}

fn check_channels<W: Write>(
    classifier: &ProximityClassifier<'_>,
    sinks: &FeatureSinks<W>,
) -> DetectResult<()> {
    let features = classifier.policy().feature_count();
    if features != sinks.len() {
        return Err(DetectError::InvalidConfig {
            reason: format!(
                "{features} features configured but {} output channels given",
                sinks.len()
            ),
        });
    }
    Ok(())
}

fn emit<W: Write>(
    classification: &Classification,
    sinks: &mut FeatureSinks<W>,
    stats: &mut StreamStats,
    progress: &Progress,
) -> DetectResult<()> {
    sinks.write(&classification.verdict)?;
    stats.record(classification);
    progress.tick(stats.classified);
    Ok(())
}

fn finish(mut stats: StreamStats, progress: &Progress) -> DetectResult<StreamStats> {
    stats.elapsed = progress.begin.elapsed();
    progress.report(stats.classified);
    if stats.malformed > 0 {
        log::warn!(
            "stream: {} malformed records classified as unverified",
            stats.malformed
        );
    }
    Ok(stats)
}
