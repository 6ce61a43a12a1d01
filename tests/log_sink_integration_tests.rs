//! Integration tests for LogSink
//!
//! These tests verify:
//! - File order equals emit order, one line per entry
//! - The fixed `<timestamp> <SEVERITY> [*] <message>` line format
//! - Emits from many threads never interleave within a line
//! - Markup characters in plain messages render literally

use build_aosp_image::models::{LogEntry, Severity, markup};
use build_aosp_image::services::LogSink;
use camino::Utf8PathBuf;
use regex::Regex;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn open_sink(temp_dir: &TempDir) -> (LogSink, build_aosp_image::services::LogStream) {
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    LogSink::open(root.join("logs/app.log")).unwrap()
}

#[test]
fn test_n_emits_give_n_ordered_lines() {
    let temp_dir = TempDir::new().unwrap();
    let (sink, mut stream) = open_sink(&temp_dir);

    let severities = [
        Severity::Debug,
        Severity::Info,
        Severity::Success,
        Severity::Warning,
        Severity::Error,
    ];
    for i in 0..50 {
        sink.emit(severities[i % severities.len()], format!("message {i}"), false);
    }
    sink.close().unwrap();

    let line_pattern =
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} (DEBUG|INFO|SUCCESS|WARNING|ERROR) \[\*\] message (\d+)$")
            .unwrap();

    let contents = fs::read_to_string(sink.path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 50);

    for (i, line) in lines.iter().enumerate() {
        let captures = line_pattern
            .captures(line)
            .unwrap_or_else(|| panic!("malformed line: {line}"));
        assert_eq!(&captures[1], severities[i % severities.len()].label());
        assert_eq!(captures[2].parse::<usize>().unwrap(), i);
    }

    // The view receives the same entries in the same order
    for i in 0..50 {
        let entry = stream.try_recv().unwrap();
        assert_eq!(entry.message, format!("message {i}"));
    }
    assert!(stream.try_recv().is_none());
}

#[test]
fn test_file_is_appended_across_sessions() {
    let temp_dir = TempDir::new().unwrap();

    let (first, _stream) = open_sink(&temp_dir);
    first.info("first session");
    drop(first);

    let (second, _stream) = open_sink(&temp_dir);
    second.info("second session");
    second.close().unwrap();

    let contents = fs::read_to_string(second.path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("first session"));
    assert!(lines[1].ends_with("second session"));
}

#[test]
fn test_concurrent_emits_keep_lines_whole() {
    let temp_dir = TempDir::new().unwrap();
    let (sink, _stream) = open_sink(&temp_dir);
    let sink = Arc::new(sink);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let sink = Arc::clone(&sink);
            std::thread::spawn(move || {
                for i in 0..100 {
                    sink.info(format!("thread {t} entry {i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    sink.close().unwrap();

    let contents = fs::read_to_string(sink.path()).unwrap();
    let line_pattern = Regex::new(r"INFO \[\*\] thread (\d) entry (\d+)$").unwrap();

    let mut last_seen = [None::<usize>; 4];
    for line in contents.lines() {
        let captures = line_pattern
            .captures(line)
            .unwrap_or_else(|| panic!("malformed line: {line}"));
        let thread: usize = captures[1].parse().unwrap();
        let entry: usize = captures[2].parse().unwrap();

        // Per-thread order is preserved
        if let Some(previous) = last_seen[thread] {
            assert!(entry > previous);
        }
        last_seen[thread] = Some(entry);
    }
    assert_eq!(contents.lines().count(), 400);
}

#[test]
fn test_markup_characters_render_literally() {
    let temp_dir = TempDir::new().unwrap();
    let (sink, mut stream) = open_sink(&temp_dir);

    let message = r#"exception: <b>"boot" & 'vendor'</b>"#;
    sink.error(message);

    let entry = stream.try_recv().unwrap();
    let rendered = entry.to_markup();
    assert!(!rendered.contains("<b>"));
    assert_eq!(markup::strip_tags(&rendered), entry.line());

    // The file keeps the raw text
    let contents = fs::read_to_string(sink.path()).unwrap();
    assert!(contents.trim_end().ends_with(message));
}

#[test]
fn test_artifact_link_round_trips_through_view() {
    let temp_dir = TempDir::new().unwrap();
    let (sink, mut stream) = open_sink(&temp_dir);

    let artifact = Utf8PathBuf::from("/srv/out dir/factory_20240309070501.zip");
    sink.success_markup(markup::file_link(&artifact));

    let entry: LogEntry = stream.try_recv().unwrap();
    let (text, link) = entry.view_text();
    assert_eq!(link.as_deref(), Some(artifact.as_str()));
    assert!(text.ends_with(artifact.as_str()));
    assert!(entry.to_markup().contains("file:///srv/out%20dir/"));
}

#[test]
fn test_entries_after_close_still_reach_stream() {
    let temp_dir = TempDir::new().unwrap();
    let (sink, mut stream) = open_sink(&temp_dir);

    sink.info("before close");
    sink.close().unwrap();
    assert!(!sink.is_open());
    sink.info("after close");

    assert_eq!(stream.try_recv().unwrap().message, "before close");
    assert_eq!(stream.try_recv().unwrap().message, "after close");

    let contents = fs::read_to_string(sink.path()).unwrap();
    assert_eq!(contents.lines().count(), 1);
}
