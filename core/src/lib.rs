//! Payment proximity fraud detection.
//!
//! Builds an undirected "has transacted with" graph from batch history, then
//! classifies each streamed payment by the hop distance between payer and
//! payee.

pub mod classify;
pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod stream;
pub mod synthetic;
pub mod types;

pub use classify::{Classification, ProximityClassifier, Trust, TrustPolicy, Verdict};
pub use config::{DetectorConfig, FeatureConfig};
pub use error::{DetectError, DetectResult, RecordError};
pub use graph::PaymentGraph;
pub use ingest::{load_graph, LoadStats, RecordSource, SourceKind};
pub use stream::{run_stream, run_stream_parallel, FeatureSinks, StreamStats};
