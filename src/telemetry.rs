//! Telemetry metric name constants.
//!
//! Centralised metric names for scrivener operations. Hosts install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `scrivener_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: entry point invoked (e.g. "generate", "chat", "test_connection")
//! - `status`: outcome: "success", "cache" or "error"

/// Total generation attempts that reached the cache/API stage.
///
/// Labels: `operation`, `status` ("success" | "cache" | "error").
pub const REQUESTS_TOTAL: &str = "scrivener_requests_total";

/// Outbound completion call duration in seconds.
///
/// Labels: `model`.
pub const UPSTREAM_DURATION_SECONDS: &str = "scrivener_upstream_duration_seconds";

/// Total tokens reported by the provider.
///
/// Labels: `model`.
pub const TOKENS_TOTAL: &str = "scrivener_tokens_total";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "scrivener_cache_hits_total";

/// Total response cache misses.
pub const CACHE_MISSES_TOTAL: &str = "scrivener_cache_misses_total";

/// Total requests refused by the hourly quota.
pub const RATE_LIMITED_TOTAL: &str = "scrivener_rate_limited_total";

/// Total usage log writes that failed (best effort telemetry).
pub const USAGE_LOG_FAILURES_TOTAL: &str = "scrivener_usage_log_failures_total";
