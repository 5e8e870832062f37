//! Prometheus Metrics Module
//!
//! # Metrics Collected
//! - Permission checks by scope kind and decision
//! - Permission check latency histograms
//! - Permission cache hits, misses and errors

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::domain::value_objects::ScopeKind;

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Permission checks by scope kind and decision ("allow", "deny")
pub static PERMISSION_CHECKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("permission_checks_total", "Total number of permission checks")
            .namespace("chat_permissions"),
        &["scope", "decision"],
    )
    .expect("Failed to create PERMISSION_CHECKS_TOTAL metric")
});

/// Permission check latency, including store lookups
pub static PERMISSION_CHECK_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0];
    HistogramVec::new(
        HistogramOpts::new(
            "permission_check_duration_seconds",
            "Permission check latency in seconds",
        )
        .namespace("chat_permissions")
        .buckets(buckets),
        &["scope"],
    )
    .expect("Failed to create PERMISSION_CHECK_DURATION_SECONDS metric")
});

/// Permission cache lookups by result ("hit", "miss", "error")
pub static PERMISSION_CACHE_LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("permission_cache_lookups_total", "Permission cache lookups")
            .namespace("chat_permissions"),
        &["result"],
    )
    .expect("Failed to create PERMISSION_CACHE_LOOKUPS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(PERMISSION_CHECKS_TOTAL.clone()))
        .expect("Failed to register PERMISSION_CHECKS_TOTAL");
    registry
        .register(Box::new(PERMISSION_CHECK_DURATION_SECONDS.clone()))
        .expect("Failed to register PERMISSION_CHECK_DURATION_SECONDS");
    registry
        .register(Box::new(PERMISSION_CACHE_LOOKUPS_TOTAL.clone()))
        .expect("Failed to register PERMISSION_CACHE_LOOKUPS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record one permission decision.
pub fn record_permission_check(scope: ScopeKind, granted: bool, duration_secs: f64) {
    let decision = if granted { "allow" } else { "deny" };
    PERMISSION_CHECKS_TOTAL
        .with_label_values(&[scope.as_str(), decision])
        .inc();
    PERMISSION_CHECK_DURATION_SECONDS
        .with_label_values(&[scope.as_str()])
        .observe(duration_secs);
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
    Error,
}

impl CacheLookup {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Error => "error",
        }
    }
}

/// Record one cache lookup.
pub fn record_cache_lookup(result: CacheLookup) {
    PERMISSION_CACHE_LOOKUPS_TOTAL
        .with_label_values(&[result.as_str()])
        .inc();
}
