//! Render and assembly job metrics.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub mod names {
    pub const RENDERS_TOTAL: &str = "clipforge_renders_total";
    pub const RENDER_DURATION_SECONDS: &str = "clipforge_render_duration_seconds";
    pub const RENDER_QUEUE_DEPTH: &str = "clipforge_render_queue_depth";
    pub const ASSEMBLIES_TOTAL: &str = "clipforge_assemblies_total";
    pub const ASSEMBLY_DURATION_SECONDS: &str = "clipforge_assembly_duration_seconds";
}

/// Count a finished render attempt. `outcome` is one of
/// `succeeded`, `retrying`, `failed`, `discarded`, `cancelled`.
pub fn record_render(outcome: &'static str) {
    counter!(names::RENDERS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_render_duration(elapsed: Duration) {
    histogram!(names::RENDER_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

pub fn set_queue_depth(depth: usize) {
    gauge!(names::RENDER_QUEUE_DEPTH).set(depth as f64);
}

pub fn record_assembly(outcome: &'static str, elapsed: Duration) {
    counter!(names::ASSEMBLIES_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::ASSEMBLY_DURATION_SECONDS, "outcome" => outcome).record(elapsed.as_secs_f64());
}
