//! Prometheus metrics for the lifecycle workers
//!
//! Tracks sweep cycles, row-level outcomes and cycle durations for the
//! expiration, boost and cleanup workers.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};
use std::time::Duration;

/// Total number of worker sweep cycles (success/error), per worker
static WORKER_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lifecycle_worker_runs_total",
        "Total number of worker sweep cycles (success/error)",
        &["worker", "status"]
    )
    .expect("failed to register lifecycle_worker_runs_total")
});

/// Duration of worker sweeps
static WORKER_SWEEP_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "lifecycle_worker_sweep_duration_seconds",
        "Duration of worker sweep cycles",
        &["worker"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("failed to register lifecycle_worker_sweep_duration_seconds")
});

/// Posts archived by the expiration worker
static POSTS_ARCHIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lifecycle_posts_archived_total",
        "Posts moved from active to archived by the expiration worker",
        &["outcome"]
    )
    .expect("failed to register lifecycle_posts_archived_total")
});

/// Boosts applied by the boost worker
static BOOSTS_APPLIED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lifecycle_boosts_applied_total",
        "Boost sweep row outcomes",
        &["outcome"]
    )
    .expect("failed to register lifecycle_boosts_applied_total")
});

/// Rows purged by the cleanup worker, per kind
static ROWS_PURGED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "lifecycle_rows_purged_total",
        "Rows removed by the cleanup worker",
        &["kind"]
    )
    .expect("failed to register lifecycle_rows_purged_total")
});

pub fn record_sweep(worker: &str, status: &str) {
    WORKER_RUNS_TOTAL.with_label_values(&[worker, status]).inc();
}

pub fn observe_sweep_duration(worker: &str, duration: Duration) {
    WORKER_SWEEP_DURATION_SECONDS
        .with_label_values(&[worker])
        .observe(duration.as_secs_f64());
}

pub fn record_archived(outcome: &str, count: u64) {
    if count > 0 {
        POSTS_ARCHIVED_TOTAL
            .with_label_values(&[outcome])
            .inc_by(count);
    }
}

pub fn record_boosts(outcome: &str, count: u64) {
    if count > 0 {
        BOOSTS_APPLIED_TOTAL
            .with_label_values(&[outcome])
            .inc_by(count);
    }
}

pub fn record_purged(kind: &str, count: u64) {
    if count > 0 {
        ROWS_PURGED_TOTAL.with_label_values(&[kind]).inc_by(count);
    }
}
