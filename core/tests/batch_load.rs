//! Batch file loading: header handling, malformed lines, fatal conditions.

use antifraud_core::{
    error::DetectError,
    ingest::{load_graph, RecordSource, SourceKind},
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Malformed lines are dropped and counted; good lines after them still load.
#[test]
fn malformed_lines_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "batch_payment.csv",
        "time, id1, id2, amount, message\n\
         2016-11-01 17:38:25, 49466, 6989, 23.74, 🦄\n\
         2016-11-01 17:38:25, 52575\n\
         2016-11-01 17:38:25, abc, 6989, 1.00, bad id\n\
         \n\
         2016-11-01 17:38:26, 6989, 8552, 19.01, Happy Birthday\n",
    );

    let (graph, stats) = load_graph(&path).expect("load");

    assert_eq!(stats.loaded, 2);
    assert_eq!(stats.skipped, 3);
    assert_eq!(graph.vertex_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.shortest_path_length(49466, 8552), Some(2));
}

/// The first line is always discarded, even when it looks like a record.
#[test]
fn header_is_discarded_unconditionally() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "batch.csv", "0, 1, 2\n0, 3, 4\n");

    let (graph, stats) = load_graph(&path).expect("load");

    assert_eq!(stats.loaded, 1);
    assert!(!graph.contains_vertex(1));
    assert!(graph.has_edge(3, 4));
}

/// A non-UTF-8 byte in the free-text message costs nothing: ids still load.
#[test]
fn undecodable_message_bytes_do_not_abort_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("batch.csv");
    fs::write(&path, b"time, id1, id2, amount, message\nt,1,2\nt,2,3,caf\xE9\nt,3,4\n").unwrap();

    let (graph, stats) = load_graph(&path).expect("load");

    assert_eq!(stats.loaded, 3);
    assert_eq!(stats.skipped, 0);
    assert!(graph.has_edge(2, 3));
    assert_eq!(graph.shortest_path_length(1, 4), Some(3));
}

/// CRLF line endings are stripped before the ids are parsed.
#[test]
fn crlf_lines_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "batch.csv", "header\r\nt,1,2\r\nt,2,3\r\n");

    let (graph, stats) = load_graph(&path).expect("load");

    assert_eq!(stats.loaded, 2);
    assert_eq!(graph.shortest_path_length(1, 3), Some(2));
}

/// A batch whose every record is malformed still builds, just empty.
#[test]
fn all_malformed_batch_builds_empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "batch.csv", "header\nnope\nstill, nope\n");

    let (graph, stats) = load_graph(&path).expect("load");

    assert_eq!(stats.loaded, 0);
    assert_eq!(stats.skipped, 2);
    assert_eq!(graph.vertex_count(), 0);
}

/// A missing batch file is a construction failure naming the file.
#[test]
fn missing_batch_file_is_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.csv");

    let err = load_graph(&path).unwrap_err();

    assert!(matches!(err, DetectError::BatchUnreadable { .. }), "got {err:?}");
    assert!(err.to_string().contains("nope.csv"));
}

/// Empty and header-only batch files both fail as empty.
#[test]
fn empty_and_header_only_batches_fail() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        ("empty.csv", ""),
        ("header.csv", "time, id1, id2, amount, message\n"),
    ];
    for (name, contents) in cases {
        let path = write_file(&dir, name, contents);
        let err = load_graph(&path).unwrap_err();
        assert!(
            matches!(err, DetectError::BatchEmpty { .. }),
            "{name}: expected BatchEmpty, got {err:?}"
        );
    }
}

/// Stream sources report their own error kinds.
#[test]
fn stream_source_errors_are_distinct() {
    let dir = tempfile::tempdir().unwrap();

    let missing = RecordSource::open(dir.path().join("missing.csv"), SourceKind::Stream);
    assert!(matches!(missing, Err(DetectError::StreamUnreadable { .. })));

    let header_only = write_file(&dir, "stream.csv", "header\n");
    let empty = RecordSource::open(&header_only, SourceKind::Stream);
    assert!(matches!(empty, Err(DetectError::StreamEmpty { .. })));
}

/// An opened source yields every line after the header, in order.
#[test]
fn record_source_yields_lines_after_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "stream.csv", "header\na\nb\nc\n");

    let lines: Vec<String> = RecordSource::open(&path, SourceKind::Stream)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(lines, vec!["a", "b", "c"]);
}
