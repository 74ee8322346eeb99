use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use super::{DailyStats, UsageLog, UsageLogEntry, newest_errors};
use crate::{Result, ScrivenerError};

/// [`UsageLog`] persisted as JSON lines in a single append-only file.
///
/// Queries scan the whole file; lines that fail to parse are skipped with a
/// warning.
pub struct JsonlUsageLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlUsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<UsageLogEntry>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(&self.path, "read", e)),
        };

        let mut entries = Vec::new();
        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = ?self.path,
                    line = index + 1,
                    error = %e,
                    "skipping malformed usage log line"
                ),
            }
        }
        Ok(entries)
    }
}

fn storage_error(path: &Path, action: &str, err: std::io::Error) -> ScrivenerError {
    ScrivenerError::Storage(format!("failed to {action} usage log {path:?}: {err}"))
}

#[async_trait]
impl UsageLog for JsonlUsageLog {
    async fn append(&self, entry: UsageLogEntry) -> Result<()> {
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| storage_error(&self.path, "open", e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| storage_error(&self.path, "append to", e))?;
        file.flush()
            .await
            .map_err(|e| storage_error(&self.path, "flush", e))
    }

    async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let entries = self.read_all().await?;
        Ok(DailyStats::from_entries(&entries, date))
    }

    async fn recent_errors(&self, limit: usize) -> Result<Vec<UsageLogEntry>> {
        let entries = self.read_all().await?;
        Ok(newest_errors(entries.iter(), limit))
    }
}
