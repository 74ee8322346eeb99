use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::{DailyStats, UsageLog, UsageLogEntry, newest_errors};
use crate::Result;

/// In-process [`UsageLog`].
#[derive(Default)]
pub struct MemoryUsageLog {
    entries: RwLock<Vec<UsageLogEntry>>,
}

impl MemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every entry in insertion order.
    pub async fn entries(&self) -> Vec<UsageLogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UsageLog for MemoryUsageLog {
    async fn append(&self, entry: UsageLogEntry) -> Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        Ok(DailyStats::from_entries(self.entries.read().await.iter(), date))
    }

    async fn recent_errors(&self, limit: usize) -> Result<Vec<UsageLogEntry>> {
        Ok(newest_errors(self.entries.read().await.iter(), limit))
    }
}
