//! Metric descriptions and recorders.
//!
//! Metrics go through the `metrics` facade. Nothing here installs an
//! exporter; a host process that wants numbers installs its own recorder and
//! calls [`register_metrics`] once so the names carry descriptions.
//!
//! # Example
//!
//! ```rust
//! use seatplan_runtime::metrics::{register_metrics, PersistenceMetrics};
//! use std::time::Duration;
//!
//! register_metrics();
//! PersistenceMetrics::record_call("write", Duration::from_millis(3));
//! ```

use metrics::{describe_counter, describe_histogram};
use std::time::Duration;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Register all metric descriptions.
pub fn register_metrics() {
    // Store Metrics
    describe_counter!(
        "store.commands.total",
        "Total number of actions sent to a store"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to run one reducer step"
    );
    describe_counter!(
        "store.effects.executed",
        "Effects executed, labelled by effect type"
    );

    // Persistence Metrics
    describe_counter!(
        "persistence.calls.total",
        "Calls made to the persistence sink, labelled by operation"
    );
    describe_counter!(
        "persistence.failures.total",
        "Persistence sink calls that failed, labelled by operation"
    );
    describe_histogram!(
        "persistence.call.duration_seconds",
        "Round-trip time of persistence sink calls"
    );

    // Seating Metrics
    describe_counter!(
        "seating.mutations.committed",
        "Mutations applied to the reservation store, labelled by kind"
    );
    describe_counter!(
        "seating.mutations.rejected",
        "Commands rejected before touching the store, labelled by reason"
    );
}

/// Persistence sink metrics recorder.
pub struct PersistenceMetrics;

impl PersistenceMetrics {
    /// Record a completed sink call.
    pub fn record_call(operation: &'static str, duration: Duration) {
        counter!("persistence.calls.total", "operation" => operation).increment(1);
        histogram!("persistence.call.duration_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Record a failed sink call.
    pub fn record_failure(operation: &'static str) {
        counter!("persistence.failures.total", "operation" => operation).increment(1);
    }
}

/// Reservation store mutation recorder.
pub struct MutationMetrics;

impl MutationMetrics {
    /// Record a mutation that reached the store.
    pub fn record_commit(kind: &'static str) {
        counter!("seating.mutations.committed", "kind" => kind).increment(1);
    }

    /// Record a command that was turned away.
    pub fn record_rejection(reason: &'static str) {
        counter!("seating.mutations.rejected", "reason" => reason).increment(1);
    }
}
