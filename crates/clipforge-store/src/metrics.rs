//! Store metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// State transitions by operation and result.
    pub const TRANSITIONS_TOTAL: &str = "clipforge_store_transitions_total";

    /// State file writes.
    pub const PERSIST_TOTAL: &str = "clipforge_store_persist_total";

    /// Size of written state snapshots in bytes.
    pub const PERSIST_BYTES: &str = "clipforge_store_persist_bytes";

    /// Failed state file writes.
    pub const PERSIST_ERRORS_TOTAL: &str = "clipforge_store_persist_errors_total";
}

/// Record a transition attempt.
pub fn record_transition(operation: &'static str, ok: bool) {
    counter!(
        names::TRANSITIONS_TOTAL,
        "operation" => operation,
        "result" => if ok { "ok" } else { "rejected" }
    )
    .increment(1);
}

pub fn record_persist(bytes: usize) {
    counter!(names::PERSIST_TOTAL).increment(1);
    histogram!(names::PERSIST_BYTES).record(bytes as f64);
}

pub fn record_persist_error() {
    counter!(names::PERSIST_ERRORS_TOTAL).increment(1);
}
