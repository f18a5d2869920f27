//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `points_mutations_total` - Committed mutations
//! - `points_rejections_total` - Mutations rejected by validation or policy
//! - `points_commit_duration_seconds` - Histogram of commit latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed mutations
    pub mutations_total: IntCounter,

    /// Rejected mutations (invalid amount, insufficient balance)
    pub rejections_total: IntCounter,

    /// Commit duration histogram
    pub commit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let mutations_total = IntCounter::with_opts(Opts::new(
            "points_mutations_total",
            "Committed balance mutations",
        ))?;
        registry.register(Box::new(mutations_total.clone()))?;

        let rejections_total = IntCounter::with_opts(Opts::new(
            "points_rejections_total",
            "Mutations rejected by validation or policy",
        ))?;
        registry.register(Box::new(rejections_total.clone()))?;

        let commit_duration = Histogram::with_opts(
            HistogramOpts::new(
                "points_commit_duration_seconds",
                "Histogram of commit latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500]),
        )?;
        registry.register(Box::new(commit_duration.clone()))?;

        Ok(Self {
            mutations_total,
            rejections_total,
            commit_duration,
            registry,
        })
    }

    /// Record a committed mutation and its latency
    pub fn record_commit(&self, duration_seconds: f64) {
        self.mutations_total.inc();
        self.commit_duration.observe(duration_seconds);
    }

    /// Record a rejected mutation
    pub fn record_rejection(&self) {
        self.rejections_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
