//! Append-only usage log.
//!
//! Every generation attempt that gets past the permission checks leaves one
//! [`UsageLogEntry`]: `success` for a provider answer, `cache` for a cache
//! hit and `error` for anything that failed afterwards. Entries are never
//! updated; retention sweeps are the host's business.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryUsageLog`]: in-process `Vec`, for tests and embedded use.
//! - [`JsonlUsageLog`]: one JSON document per line in an append-only file.

mod jsonl;
mod memory;

pub use jsonl::JsonlUsageLog;
pub use memory::MemoryUsageLog;

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::{RequesterId, SubjectId};

/// Outcome recorded for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Success,
    Cache,
    Error,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Success => "success",
            UsageStatus::Cache => "cache",
            UsageStatus::Error => "error",
        }
    }
}

impl fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the usage log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub requester_id: RequesterId,
    pub subject_id: SubjectId,
    pub prompt: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub tokens_used: u32,
    pub model: String,
    pub status: UsageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UsageLogEntry {
    pub fn success(
        requester_id: RequesterId,
        subject_id: SubjectId,
        prompt: impl Into<String>,
        response: impl Into<String>,
        tokens_used: u32,
        model: impl Into<String>,
    ) -> Self {
        Self {
            requester_id,
            subject_id,
            prompt: prompt.into(),
            response: response.into(),
            tokens_used,
            model: model.into(),
            status: UsageStatus::Success,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn cache_hit(
        requester_id: RequesterId,
        subject_id: SubjectId,
        prompt: impl Into<String>,
        response: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            status: UsageStatus::Cache,
            tokens_used: 0,
            ..Self::success(requester_id, subject_id, prompt, response, 0, model)
        }
    }

    pub fn error(
        requester_id: RequesterId,
        subject_id: SubjectId,
        prompt: impl Into<String>,
        model: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: UsageStatus::Error,
            error_message: Some(message.into()),
            ..Self::success(requester_id, subject_id, prompt, "", 0, model)
        }
    }

    /// Override the timestamp (imports, tests).
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Aggregate over one calendar day's `success` rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub total_requests: u64,
    pub total_tokens: u64,
    pub unique_requesters: u64,
}

impl DailyStats {
    /// Aggregate `entries` for `date` (UTC).
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a UsageLogEntry>, date: NaiveDate) -> Self {
        let mut stats = DailyStats::default();
        let mut requesters = HashSet::new();
        for entry in entries {
            if entry.status != UsageStatus::Success || entry.created_at.date_naive() != date {
                continue;
            }
            stats.total_requests += 1;
            stats.total_tokens += u64::from(entry.tokens_used);
            requesters.insert(entry.requester_id);
        }
        stats.unique_requesters = requesters.len() as u64;
        stats
    }
}

/// Newest-first `error` rows, at most `limit`.
fn newest_errors<'a>(
    entries: impl DoubleEndedIterator<Item = &'a UsageLogEntry>,
    limit: usize,
) -> Vec<UsageLogEntry> {
    entries
        .rev()
        .filter(|e| e.status == UsageStatus::Error)
        .take(limit)
        .cloned()
        .collect()
}

/// Insert-only store of usage entries.
#[async_trait]
pub trait UsageLog: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: UsageLogEntry) -> Result<()>;

    /// Totals over `success` rows created on `date` (UTC).
    async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats>;

    /// The `limit` most recent `error` rows, newest first.
    async fn recent_errors(&self, limit: usize) -> Result<Vec<UsageLogEntry>>;
}
