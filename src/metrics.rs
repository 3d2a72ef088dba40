//! Observability metrics for the dependency manager.
//!
//! Metrics are exposed via the `metrics` crate facade; the embedding process
//! installs an exporter (e.g. Prometheus) at startup. Four gauges mirror the
//! primary index sizes:
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `taskdep_subscribed_tasks` | Gauge | Tasks with an active get-dependency subscription |
//! | `taskdep_required_tasks` | Gauge | Creating tasks with at least one required output |
//! | `taskdep_required_objects` | Gauge | Objects with an outstanding pull or reconstruction |
//! | `taskdep_pending_tasks` | Gauge | Tasks pending local execution |

use metrics::gauge;

/// Metric names as constants for consistency.
pub mod names {
    /// Gauge: tasks with an active get-dependency subscription.
    pub const SUBSCRIBED_TASKS: &str = "taskdep_subscribed_tasks";
    /// Gauge: creating tasks with at least one required output object.
    pub const REQUIRED_TASKS: &str = "taskdep_required_tasks";
    /// Gauge: objects with an outstanding pull or reconstruction.
    pub const REQUIRED_OBJECTS: &str = "taskdep_required_objects";
    /// Gauge: tasks whose execution is pending on this node.
    pub const PENDING_TASKS: &str = "taskdep_pending_tasks";
}

/// High-level interface for recording dependency-manager metrics.
///
/// Cheap to clone and construct; all state lives in the installed recorder.
#[derive(Debug, Clone, Default)]
pub struct DepMetrics {
    _private: (),
}

impl DepMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the `taskdep_subscribed_tasks` gauge.
    #[allow(clippy::cast_precision_loss)] // Gauge values are typically small
    pub fn set_subscribed_tasks(&self, count: usize) {
        gauge!(names::SUBSCRIBED_TASKS).set(count as f64);
    }

    /// Updates the `taskdep_required_tasks` gauge.
    #[allow(clippy::cast_precision_loss)] // Gauge values are typically small
    pub fn set_required_tasks(&self, count: usize) {
        gauge!(names::REQUIRED_TASKS).set(count as f64);
    }

    /// Updates the `taskdep_required_objects` gauge.
    #[allow(clippy::cast_precision_loss)] // Gauge values are typically small
    pub fn set_required_objects(&self, count: usize) {
        gauge!(names::REQUIRED_OBJECTS).set(count as f64);
    }

    /// Updates the `taskdep_pending_tasks` gauge.
    #[allow(clippy::cast_precision_loss)] // Gauge values are typically small
    pub fn set_pending_tasks(&self, count: usize) {
        gauge!(names::PENDING_TASKS).set(count as f64);
    }
}
