//! Per-user hourly request quota.
//!
//! Each requester owns one window stored under its id: a request count and
//! the instant the window ends. The first recorded request opens a window
//! one hour long; later requests increment the count without moving the end.
//! Once the end passes the window is gone and the next request opens a new one.
//!
//! Concurrent increments for the same requester are not coordinated, so a
//! burst of simultaneous requests may undercount.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::store::ExpiringStore;
use crate::types::RequesterId;
use crate::{Result, ScrivenerError};

/// Length of a quota window.
pub const WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Window {
    count: u32,
    expires_at: DateTime<Utc>,
}

/// Hourly per-requester request counter over an [`ExpiringStore`] namespace.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn ExpiringStore>,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn ExpiringStore>) -> Self {
        Self {
            store,
            window: WINDOW,
        }
    }

    /// Use a window length other than one hour.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Whether `requester` may issue another request under `ceiling`.
    ///
    /// A ceiling of 0 means unlimited.
    pub async fn check_allowed(&self, requester: RequesterId, ceiling: u32) -> Result<bool> {
        if ceiling == 0 {
            return Ok(true);
        }
        Ok(match self.current(requester).await? {
            Some(window) => window.count < ceiling,
            None => true,
        })
    }

    /// Count one request against `requester`'s current window, opening a
    /// new window if none is active.
    pub async fn record_request(&self, requester: RequesterId) -> Result<()> {
        let now = Utc::now();
        let window = match self.current(requester).await? {
            Some(active) => Window {
                count: active.count.saturating_add(1),
                expires_at: active.expires_at,
            },
            None => {
                let length = chrono::Duration::from_std(self.window)
                    .map_err(|e| ScrivenerError::Configuration(format!("rate window: {e}")))?;
                Window {
                    count: 1,
                    expires_at: now + length,
                }
            }
        };

        let ttl = (window.expires_at - now).to_std().unwrap_or(Duration::ZERO);
        let value = serde_json::to_string(&window)?;
        self.store.set(&requester.to_string(), value, ttl).await
    }

    /// Requests left in the current window, or `None` when unlimited.
    pub async fn remaining(&self, requester: RequesterId, ceiling: u32) -> Result<Option<u32>> {
        if ceiling == 0 {
            return Ok(None);
        }
        let used = self
            .current(requester)
            .await?
            .map(|w| w.count)
            .unwrap_or(0);
        Ok(Some(ceiling.saturating_sub(used)))
    }

    async fn current(&self, requester: RequesterId) -> Result<Option<Window>> {
        let Some(raw) = self.store.get(&requester.to_string()).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Window>(&raw) {
            Ok(window) if window.expires_at > Utc::now() => Ok(Some(window)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(requester, error = %e, "discarding unreadable rate window");
                Ok(None)
            }
        }
    }
}
