//! Process-wide query counters, exposed on `/api/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

#[derive(Default)]
struct QueryMetrics {
    total: AtomicU64,
    failed: AtomicU64,
    timeouts: AtomicU64,
    duration_total_us: AtomicU64,
    duration_max_us: AtomicU64,
}

static QUERY_METRICS: OnceLock<QueryMetrics> = OnceLock::new();

fn metrics() -> &'static QueryMetrics {
    QUERY_METRICS.get_or_init(QueryMetrics::default)
}

/// Records one finished statement.
pub fn record_query(duration_ms: f64, success: bool) {
    let duration_us = (duration_ms.max(0.0) * 1000.0) as u64;
    let metrics = metrics();
    metrics.total.fetch_add(1, Ordering::Relaxed);
    if !success {
        metrics.failed.fetch_add(1, Ordering::Relaxed);
    }
    metrics
        .duration_total_us
        .fetch_add(duration_us, Ordering::Relaxed);
    metrics
        .duration_max_us
        .fetch_max(duration_us, Ordering::Relaxed);
}

pub fn record_timeout() {
    metrics().timeouts.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetricsSnapshot {
    pub total: u64,
    pub failed: u64,
    pub timeouts: u64,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

pub fn snapshot() -> QueryMetricsSnapshot {
    let metrics = metrics();
    let total = metrics.total.load(Ordering::Relaxed);
    let duration_total_us = metrics.duration_total_us.load(Ordering::Relaxed);
    let max_us = metrics.duration_max_us.load(Ordering::Relaxed);

    QueryMetricsSnapshot {
        total,
        failed: metrics.failed.load(Ordering::Relaxed),
        timeouts: metrics.timeouts.load(Ordering::Relaxed),
        avg_ms: (total > 0).then(|| duration_total_us as f64 / total as f64 / 1000.0),
        max_ms: (max_us > 0).then(|| max_us as f64 / 1000.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Counters are global and other tests record into them, so only deltas
    // and lower bounds are checked.
    #[test]
    fn test_metrics_flow() {
        let initial = snapshot();

        record_query(12.5, true);
        let s1 = snapshot();
        assert!(s1.total > initial.total);
        assert!(s1.avg_ms.is_some());

        record_query(3.0, false);
        let s2 = snapshot();
        assert!(s2.failed > s1.failed);

        record_timeout();
        assert!(snapshot().timeouts > initial.timeouts);

        record_query(99_999.0, true);
        assert!(snapshot().max_ms.unwrap() >= 99_999.0);
    }

    #[test]
    fn test_negative_durations_are_clamped() {
        record_query(-5.0, true);
        let snap = snapshot();
        assert!(snap.avg_ms.unwrap() >= 0.0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert!(json.get("avgMs").is_some());
        assert!(json.get("maxMs").is_some());
    }
}
