use std::path::PathBuf;
use thiserror::Error;

/// Fatal, setup-tier failures. Any of these halts the run before a single
/// transaction is classified.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Can't read input file for batch data: {}", path.display())]
    BatchUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("batch file is empty: {}", path.display())]
    BatchEmpty { path: PathBuf },

    #[error("Can't read stream file: {}", path.display())]
    StreamUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stream file is empty: {}", path.display())]
    StreamEmpty { path: PathBuf },

    #[error("Can't open file to write: {}", path.display())]
    OutputUnopenable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DetectResult<T> = Result<T, DetectError>;

/// Per-record failures. These never escape the pipeline: a bad batch line is
/// skipped, a bad stream line classifies as unreachable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected at least 3 fields, found {found}")]
    MissingField { found: usize },

    #[error("invalid person id {raw:?}")]
    InvalidId { raw: String },
}
