//! Tests for the JSON-lines usage log.

use chrono::{NaiveDate, TimeZone, Utc};
use scrivener::usage::JsonlUsageLog;
use scrivener::{UsageLog, UsageLogEntry, UsageStatus};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
}

#[tokio::test]
async fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.jsonl");

    {
        let log = JsonlUsageLog::new(&path);
        log.append(
            UsageLogEntry::success(1, 10, "prompt", "text", 120, "gpt-4")
                .at(Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap()),
        )
        .await
        .unwrap();
        log.append(
            UsageLogEntry::error(2, 10, "prompt", "gpt-4", "API error (500): boom")
                .at(Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap()),
        )
        .await
        .unwrap();
    }

    let reopened = JsonlUsageLog::new(&path);
    let stats = reopened.daily_stats(day(2)).await.unwrap();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(stats.total_tokens, 120);
    assert_eq!(stats.unique_requesters, 1);

    let errors = reopened.recent_errors(5).await.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].status, UsageStatus::Error);
    assert_eq!(errors[0].error_message.as_deref(), Some("API error (500): boom"));
}

#[tokio::test]
async fn one_json_document_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.jsonl");
    let log = JsonlUsageLog::new(&path);

    log.append(UsageLogEntry::cache_hit(3, 11, "p", "r", "gpt-4o"))
        .await
        .unwrap();
    log.append(UsageLogEntry::success(3, 11, "p", "r", 9, "gpt-4o"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = raw.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["status"], "cache");
    assert_eq!(first["tokens_used"], 0);
}

#[tokio::test]
async fn malformed_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.jsonl");
    let log = JsonlUsageLog::new(&path);

    log.append(
        UsageLogEntry::error(1, 1, "p", "gpt-4", "first")
            .at(Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap()),
    )
    .await
    .unwrap();
    {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
    }
    log.append(
        UsageLogEntry::error(1, 1, "p", "gpt-4", "second")
            .at(Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()),
    )
    .await
    .unwrap();

    let errors = log.recent_errors(10).await.unwrap();
    let messages: Vec<_> = errors
        .iter()
        .map(|e| e.error_message.as_deref().unwrap())
        .collect();
    assert_eq!(messages, vec!["second", "first"]);
}

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log = JsonlUsageLog::new(dir.path().join("absent.jsonl"));

    assert_eq!(log.daily_stats(day(1)).await.unwrap().total_requests, 0);
    assert!(log.recent_errors(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn unwritable_path_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let log = JsonlUsageLog::new(dir.path().join("no-such-dir").join("usage.jsonl"));

    let err = log
        .append(UsageLogEntry::success(1, 1, "p", "r", 1, "gpt-4"))
        .await
        .unwrap_err();
    assert!(matches!(err, scrivener::ScrivenerError::Storage(_)));
}
