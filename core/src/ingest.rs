//! Batch and stream record ingest.
//!
//! Both inputs share one line format: a header line, then comma-separated
//! records whose fields 1 and 2 are the payer and payee ids. Everything else
//! on the line (time, amount, message) is carried but never interpreted.

use crate::{
    error::{DetectError, DetectResult, RecordError},
    graph::PaymentGraph,
    types::PersonId,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Extract (payer, payee) from a raw record line.
pub fn parse_ids(line: &str) -> Result<(PersonId, PersonId), RecordError> {
    let mut fields = line.split(',');
    let _time = fields.next();
    let (Some(payer), Some(payee)) = (fields.next(), fields.next()) else {
        return Err(RecordError::MissingField {
            found: line.split(',').count(),
        });
    };
    Ok((parse_id(payer)?, parse_id(payee)?))
}

fn parse_id(raw: &str) -> Result<PersonId, RecordError> {
    raw.trim().parse().map_err(|_| RecordError::InvalidId {
        raw: raw.to_string(),
    })
}

/// Which input a source is. Selects the fatal error reported for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Batch,
    Stream,
}

impl SourceKind {
    fn unreadable(self, path: &Path, source: io::Error) -> DetectError {
        let path = path.to_path_buf();
        match self {
            Self::Batch => DetectError::BatchUnreadable { path, source },
            Self::Stream => DetectError::StreamUnreadable { path, source },
        }
    }

    fn empty(self, path: &Path) -> DetectError {
        let path = path.to_path_buf();
        match self {
            Self::Batch => DetectError::BatchEmpty { path },
            Self::Stream => DetectError::StreamEmpty { path },
        }
    }
}

/// Record lines of a source, header already consumed.
/// Guaranteed at construction to hold at least one line.
///
/// Lines are decoded lossily: a stray non-UTF-8 byte in a free-text field
/// must not cost the record, since only the ASCII id fields are read.
pub struct RecordSource<R: BufRead> {
    path: PathBuf,
    reader: R,
    pending: Option<String>,
    buf: Vec<u8>,
}

impl RecordSource<BufReader<File>> {
    /// Open `path`, drop its header line, and fail if nothing follows it.
    pub fn open(path: impl AsRef<Path>, kind: SourceKind) -> DetectResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| kind.unreadable(path, e))?;
        Self::from_reader(BufReader::new(file), path, kind)
    }
}

impl<R: BufRead> RecordSource<R> {
    pub fn from_reader(
        reader: R,
        path: impl AsRef<Path>,
        kind: SourceKind,
    ) -> DetectResult<Self> {
        let path = path.as_ref();
        let mut source = Self {
            path: path.to_path_buf(),
            reader,
            pending: None,
            buf: Vec::new(),
        };

        let header = source.read_line().map_err(|e| kind.unreadable(path, e))?;
        if header.is_none() {
            return Err(kind.empty(path));
        }
        source.pending = source.read_line().map_err(|e| kind.unreadable(path, e))?;
        if source.pending.is_none() {
            return Err(kind.empty(path));
        }

        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next line without its `\n` or `\r\n` terminator, `None` at EOF.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

impl<R: BufRead> Iterator for RecordSource<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.pending.take() {
            return Some(Ok(line));
        }
        self.read_line().transpose()
    }
}

/// Outcome counters for one graph build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Records that produced an edge insertion attempt.
    pub loaded: u64,
    /// Malformed records dropped.
    pub skipped: u64,
    pub elapsed: Duration,
}

/// Accumulates batch records into a graph.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: PaymentGraph,
    loaded: u64,
    skipped: u64,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one record. A malformed record is counted and reported back,
    /// the builder stays usable.
    pub fn push_line(&mut self, line: &str) -> Result<(), RecordError> {
        match parse_ids(line) {
            Ok((payer, payee)) => {
                self.graph.add_edge(payer, payee);
                self.loaded += 1;
                Ok(())
            }
            Err(e) => {
                self.skipped += 1;
                Err(e)
            }
        }
    }

    pub fn finish(self, elapsed: Duration) -> (PaymentGraph, LoadStats) {
        let stats = LoadStats {
            loaded: self.loaded,
            skipped: self.skipped,
            elapsed,
        };
        (self.graph, stats)
    }
}

/// Build the payment graph from an opened batch source.
/// A read error from the underlying source is fatal; a malformed or
/// partly undecodable line is not.
pub fn build_graph<R: BufRead>(
    source: RecordSource<R>,
) -> DetectResult<(PaymentGraph, LoadStats)> {
    let begin = Instant::now();
    let path = source.path().to_path_buf();
    let mut builder = GraphBuilder::new();

    for (index, line) in source.enumerate() {
        let line = line?;
        if let Err(e) = builder.push_line(&line) {
            // +2: one for the header, one for 1-based line numbers.
            log::debug!(
                "batch: skipping line {} of {}: {e}",
                index + 2,
                path.display()
            );
        }
    }

    let (graph, stats) = builder.finish(begin.elapsed());
    if stats.skipped > 0 {
        log::warn!(
            "batch: skipped {} malformed records in {}",
            stats.skipped,
            path.display()
        );
    }
    log::info!(
        "Loaded {} transactions in graph ({} people, {} relationships) in {:.2}s",
        stats.loaded,
        graph.vertex_count(),
        graph.edge_count(),
        stats.elapsed.as_secs_f64()
    );
    Ok((graph, stats))
}

/// Open the batch file at `path` and build the payment graph from it.
pub fn load_graph(path: impl AsRef<Path>) -> DetectResult<(PaymentGraph, LoadStats)> {
    let path = path.as_ref();
    log::info!("Building payment graph from {}", path.display());
    build_graph(RecordSource::open(path, SourceKind::Batch)?)
}
