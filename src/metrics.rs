// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the Isotope operator.
//!
//! This module provides metrics collection with the namespace prefix
//! `iso_gtrfc_com_` (prometheus-safe version of "iso.gtrfc.com").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliation operations and their outcomes
//! - **Secret Lifecycle Metrics** - Track generated, rotated, and replicated fields/copies
//! - **Error Metrics** - Track error conditions and types
//! - **Leader Election Metrics** - Track leadership state changes

use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all Isotope metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "iso_gtrfc_com";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by controller and status
///
/// Labels:
/// - `controller`: `generator` or `replicator`
/// - `status`: Outcome (`success`, `error`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by controller and status",
    );
    let counter = CounterVec::new(opts, &["controller", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `controller`: `generator` or `replicator`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by controller",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["controller"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Secret Lifecycle Metrics
// ============================================================================

/// Total number of field values written by the generator
///
/// Labels:
/// - `kind`: `generated` (first materialization) or `rotated`
pub static FIELDS_WRITTEN_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_fields_written_total"),
        "Total number of field values written by the generator, by kind",
    );
    let counter = CounterVec::new(opts, &["kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of Secrets replicated
///
/// Labels:
/// - `mode`: `pull` or `push`
pub static SECRETS_REPLICATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_secrets_replicated_total"),
        "Total number of Secrets replicated, by mode",
    );
    let counter = CounterVec::new(opts, &["mode"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of pushed copies deleted during source cleanup
pub static COPIES_PRUNED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_copies_pruned_total"),
        "Total number of pushed copies deleted during source cleanup",
    );
    let counter = CounterVec::new(opts, &["controller"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of Kubernetes events emitted
///
/// Labels:
/// - `reason`: Documented event reason (e.g., `GenerationSucceeded`)
pub static EVENTS_EMITTED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_events_emitted_total"),
        "Total number of Kubernetes events emitted, by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by controller and error category
///
/// Labels:
/// - `controller`: `generator` or `replicator`
/// - `error_type`: Category of error (`api_error`, `user_data_error`, `policy_violation`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by controller and error category",
    );
    let counter = CounterVec::new(opts, &["controller", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Leader Election Metrics
// ============================================================================

/// Total number of leader election events
///
/// Labels:
/// - `status`: Event type (`acquired`, `lost`)
pub static LEADER_ELECTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_leader_elections_total"),
        "Total number of leader election events by status",
    );
    let counter = CounterVec::new(opts, &["status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Current leader election status
///
/// Labels:
/// - `pod_name`: Name of the pod
///
/// Value: 1 if leader, 0 if follower
pub static LEADER_STATUS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_leader_status"),
        "Current leader election status (1 = leader, 0 = follower)",
    );
    let gauge = GaugeVec::new(opts, &["pod_name"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `controller` - The controller that reconciled (`generator` or `replicator`)
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(controller: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[controller])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `controller` - The controller that reconciled
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(controller: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[controller, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[controller])
        .observe(duration.as_secs_f64());
}

/// Record freshly materialized field values
pub fn record_fields_generated(count: u64) {
    #[allow(clippy::cast_precision_loss)]
    FIELDS_WRITTEN_TOTAL
        .with_label_values(&["generated"])
        .inc_by(count as f64);
}

/// Record rotated field values
pub fn record_fields_rotated(count: u64) {
    #[allow(clippy::cast_precision_loss)]
    FIELDS_WRITTEN_TOTAL
        .with_label_values(&["rotated"])
        .inc_by(count as f64);
}

/// Record a completed replication write
///
/// # Arguments
/// * `mode` - `pull` or `push`
pub fn record_replication(mode: &str) {
    SECRETS_REPLICATED_TOTAL.with_label_values(&[mode]).inc();
}

/// Record pushed copies deleted during source cleanup
pub fn record_copies_pruned(count: u64) {
    #[allow(clippy::cast_precision_loss)]
    COPIES_PRUNED_TOTAL
        .with_label_values(&["replicator"])
        .inc_by(count as f64);
}

/// Record an emitted Kubernetes event
pub fn record_event_emitted(reason: &str) {
    EVENTS_EMITTED_TOTAL.with_label_values(&[reason]).inc();
}

/// Record an error
///
/// # Arguments
/// * `controller` - The controller where the error occurred
/// * `error_type` - Category of error (e.g., `api_error`, `user_data_error`)
pub fn record_error(controller: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[controller, error_type])
        .inc();
}

/// Record leader election acquired
///
/// # Arguments
/// * `pod_name` - Name of the pod that acquired leadership
pub fn record_leader_elected(pod_name: &str) {
    LEADER_ELECTIONS_TOTAL
        .with_label_values(&["acquired"])
        .inc();
    LEADER_STATUS.with_label_values(&[pod_name]).set(1.0);
}

/// Record leader election lost
///
/// # Arguments
/// * `pod_name` - Name of the pod that lost leadership
pub fn record_leader_lost(pod_name: &str) {
    LEADER_ELECTIONS_TOTAL.with_label_values(&["lost"]).inc();
    LEADER_STATUS.with_label_values(&[pod_name]).set(0.0);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
