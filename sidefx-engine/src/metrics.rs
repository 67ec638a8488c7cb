//! Lifecycle and reduction metrics
//!
//! Counters let tests and diagnostics confirm how often the reducer actually
//! ran, how many updates were skipped as no-ops, and how long reductions took.

use crate::pipeline::Routed;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters for one manager
#[derive(Debug)]
pub struct EmitMetrics {
    /// Diagnostic label of the manager
    pub label: String,

    pub attach_count: AtomicU64,
    pub detach_count: AtomicU64,

    /// Updates that replaced props and re-ran the reducer
    pub committed_update_count: AtomicU64,

    /// Updates dropped because the props were shallow-equal
    pub skipped_update_count: AtomicU64,

    pub reduce_count: AtomicU64,
    pub dispatch_count: AtomicU64,
    pub server_map_count: AtomicU64,
    pub finalize_count: AtomicU64,

    /// Total time spent in the pipeline (nanoseconds)
    pub total_reduce_time_ns: AtomicU64,
}

impl EmitMetrics {
    pub fn new(label: impl Into<String>) -> Self {
        EmitMetrics {
            label: label.into(),
            attach_count: AtomicU64::new(0),
            detach_count: AtomicU64::new(0),
            committed_update_count: AtomicU64::new(0),
            skipped_update_count: AtomicU64::new(0),
            reduce_count: AtomicU64::new(0),
            dispatch_count: AtomicU64::new(0),
            server_map_count: AtomicU64::new(0),
            finalize_count: AtomicU64::new(0),
            total_reduce_time_ns: AtomicU64::new(0),
        }
    }

    pub fn record_attach(&self) {
        self.attach_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detach(&self) {
        self.detach_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self, committed: bool) {
        let counter = if committed {
            &self.committed_update_count
        } else {
            &self.skipped_update_count
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_finalize(&self) {
        self.finalize_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one pipeline run
    pub fn record_reduce(&self, routed: Routed, duration: Duration) {
        self.reduce_count.fetch_add(1, Ordering::Relaxed);
        match routed {
            Routed::Dispatched => {
                self.dispatch_count.fetch_add(1, Ordering::Relaxed);
            }
            Routed::ServerMapped => {
                self.server_map_count.fetch_add(1, Ordering::Relaxed);
            }
            Routed::Cached => {}
        }
        self.total_reduce_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            label: self.label.clone(),
            attaches: self.attach_count.load(Ordering::Relaxed),
            detaches: self.detach_count.load(Ordering::Relaxed),
            committed_updates: self.committed_update_count.load(Ordering::Relaxed),
            skipped_updates: self.skipped_update_count.load(Ordering::Relaxed),
            reduces: self.reduce_count.load(Ordering::Relaxed),
            dispatches: self.dispatch_count.load(Ordering::Relaxed),
            server_maps: self.server_map_count.load(Ordering::Relaxed),
            finalizes: self.finalize_count.load(Ordering::Relaxed),
            total_time_ns: self.total_reduce_time_ns.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.attach_count,
            &self.detach_count,
            &self.committed_update_count,
            &self.skipped_update_count,
            &self.reduce_count,
            &self.dispatch_count,
            &self.server_map_count,
            &self.finalize_count,
            &self.total_reduce_time_ns,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of manager metrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub label: String,
    pub attaches: u64,
    pub detaches: u64,
    pub committed_updates: u64,
    pub skipped_updates: u64,
    pub reduces: u64,
    pub dispatches: u64,
    pub server_maps: u64,
    pub finalizes: u64,
    pub total_time_ns: u64,
}

impl MetricsSnapshot {
    /// Fraction of updates that turned out to be no-ops
    pub fn skip_rate(&self) -> f64 {
        let total = self.committed_updates + self.skipped_updates;
        if total == 0 {
            0.0
        } else {
            self.skipped_updates as f64 / total as f64
        }
    }

    pub fn avg_reduce_time(&self) -> Duration {
        if self.reduces == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_time_ns / self.reduces)
        }
    }
}

/// Counters only; timings vary between runs and stay out of the display
impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Manager: {}", self.label)?;
        writeln!(
            f,
            "  Attaches: {} | Detaches: {} | Finalizes: {}",
            self.attaches, self.detaches, self.finalizes
        )?;
        writeln!(
            f,
            "  Updates: {} committed | {} skipped | Skip Rate: {:.1}%",
            self.committed_updates,
            self.skipped_updates,
            self.skip_rate() * 100.0
        )?;
        writeln!(
            f,
            "  Reduces: {} | Dispatches: {} | Server Maps: {}",
            self.reduces, self.dispatches, self.server_maps
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = EmitMetrics::new("SideEffect(Title)");

        metrics.record_attach();
        metrics.record_update(true);
        metrics.record_update(false);
        metrics.record_update(false);
        metrics.record_reduce(Routed::Dispatched, Duration::from_millis(2));
        metrics.record_reduce(Routed::Dispatched, Duration::from_millis(4));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.attaches, 1);
        assert_eq!(snapshot.committed_updates, 1);
        assert_eq!(snapshot.skipped_updates, 2);
        assert_eq!(snapshot.reduces, 2);
        assert_eq!(snapshot.dispatches, 2);
        assert_eq!(snapshot.server_maps, 0);
        assert_eq!(snapshot.skip_rate(), 2.0 / 3.0);
        assert_eq!(snapshot.avg_reduce_time(), Duration::from_millis(3));
    }

    #[test]
    fn test_routing_counters() {
        let metrics = EmitMetrics::new("m");
        metrics.record_reduce(Routed::ServerMapped, Duration::ZERO);
        metrics.record_reduce(Routed::Cached, Duration::ZERO);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.reduces, 2);
        assert_eq!(snapshot.server_maps, 1);
        assert_eq!(snapshot.dispatches, 0);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = EmitMetrics::new("m");
        metrics.record_attach();
        metrics.record_finalize();
        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.attaches, 0);
        assert_eq!(snapshot.finalizes, 0);
        assert_eq!(snapshot.avg_reduce_time(), Duration::ZERO);
    }

    #[test]
    fn test_display() {
        let metrics = EmitMetrics::new("SideEffect(Title)");
        metrics.record_attach();
        metrics.record_attach();
        metrics.record_detach();
        metrics.record_update(false);
        metrics.record_reduce(Routed::Dispatched, Duration::from_micros(5));

        insta::assert_snapshot!(metrics.snapshot().to_string().trim_end(), @r"
        Manager: SideEffect(Title)
          Attaches: 2 | Detaches: 1 | Finalizes: 0
          Updates: 0 committed | 1 skipped | Skip Rate: 100.0%
          Reduces: 1 | Dispatches: 1 | Server Maps: 0
        ");
    }
}
