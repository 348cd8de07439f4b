//! Runtime Metrics & Instrumentation
//!
//! Lock-free counters for edge churn, updated on every mutation, and a
//! per-tick budget monitor behind a `parking_lot::Mutex` touched once per
//! tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters for high-frequency interest events.
#[derive(Debug)]
pub struct InterestCounters {
    /// Edges inserted across all relations.
    pub edges_added: AtomicU64,
    /// Inserts rejected by a tracking policy.
    pub edges_rejected: AtomicU64,
    /// Target edges redirected to the candidate.
    pub inversions: AtomicU64,
    /// Agents queued for delayed destruction.
    pub pending_queued: AtomicU64,
    /// Pending entries cancelled by re-entry.
    pub pending_cancelled: AtomicU64,
    /// Pending entries forgotten after the grace period.
    pub pending_expired: AtomicU64,
    /// Agents torn down.
    pub teardowns: AtomicU64,
}

impl InterestCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            edges_added: AtomicU64::new(0),
            edges_rejected: AtomicU64::new(0),
            inversions: AtomicU64::new(0),
            pending_queued: AtomicU64::new(0),
            pending_cancelled: AtomicU64::new(0),
            pending_expired: AtomicU64::new(0),
            teardowns: AtomicU64::new(0),
        }
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            edges_added: self.edges_added.load(Ordering::Relaxed),
            edges_rejected: self.edges_rejected.load(Ordering::Relaxed),
            inversions: self.inversions.load(Ordering::Relaxed),
            pending_queued: self.pending_queued.load(Ordering::Relaxed),
            pending_cancelled: self.pending_cancelled.load(Ordering::Relaxed),
            pending_expired: self.pending_expired.load(Ordering::Relaxed),
            teardowns: self.teardowns.load(Ordering::Relaxed),
        }
    }
}

impl Default for InterestCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Edges inserted.
    pub edges_added: u64,
    /// Inserts rejected by policy.
    pub edges_rejected: u64,
    /// Target inversions.
    pub inversions: u64,
    /// Pending entries queued.
    pub pending_queued: u64,
    /// Pending entries cancelled.
    pub pending_cancelled: u64,
    /// Pending entries expired.
    pub pending_expired: u64,
    /// Teardowns.
    pub teardowns: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP kenn_edges_added_total Relationship edges inserted\n\
             # TYPE kenn_edges_added_total counter\n\
             kenn_edges_added_total {}\n\
             # HELP kenn_edges_rejected_total Edge inserts rejected by policy\n\
             # TYPE kenn_edges_rejected_total counter\n\
             kenn_edges_rejected_total {}\n\
             # HELP kenn_inversions_total Target edges recorded on the candidate instead\n\
             # TYPE kenn_inversions_total counter\n\
             kenn_inversions_total {}\n\
             # HELP kenn_pending_total Pending-destruction transitions\n\
             # TYPE kenn_pending_total counter\n\
             kenn_pending_total{{outcome=\"queued\"}} {}\n\
             kenn_pending_total{{outcome=\"cancelled\"}} {}\n\
             kenn_pending_total{{outcome=\"expired\"}} {}\n\
             # HELP kenn_teardowns_total Agents torn down\n\
             # TYPE kenn_teardowns_total counter\n\
             kenn_teardowns_total {}\n",
            self.edges_added,
            self.edges_rejected,
            self.inversions,
            self.pending_queued,
            self.pending_cancelled,
            self.pending_expired,
            self.teardowns,
        )
    }
}

// ---------------------------------------------------------------------------
// Tick Budget Monitor
// ---------------------------------------------------------------------------

/// Wall-clock cost of whole interest ticks against a budget.
///
/// ```rust
/// # use std::time::Duration;
/// # use kenn_core::metrics::TickBudgetMonitor;
/// let monitor = TickBudgetMonitor::new(5.0);
/// assert!(!monitor.record(Duration::from_millis(2)));
/// assert!(monitor.record(Duration::from_millis(8)));
/// assert_eq!(monitor.slow_ticks(), 1);
/// ```
#[derive(Debug)]
pub struct TickBudgetMonitor {
    budget_ms: f64,
    stats: Mutex<TickStats>,
}

#[derive(Debug, Default)]
struct TickStats {
    ticks: u64,
    slow_ticks: u64,
    last_ms: f64,
    worst_ms: f64,
}

impl TickBudgetMonitor {
    /// Create a monitor flagging ticks slower than `budget_ms`.
    #[must_use]
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget_ms,
            stats: Mutex::new(TickStats::default()),
        }
    }

    /// Record one tick. Returns `true` if it overran the budget.
    pub fn record(&self, elapsed: Duration) -> bool {
        let ms = elapsed.as_secs_f64() * 1000.0;
        let over = ms > self.budget_ms;
        let mut stats = self.stats.lock();
        stats.ticks += 1;
        stats.last_ms = ms;
        stats.worst_ms = stats.worst_ms.max(ms);
        if over {
            stats.slow_ticks += 1;
        }
        over
    }

    /// Ticks recorded so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.stats.lock().ticks
    }

    /// Ticks that overran the budget.
    #[must_use]
    pub fn slow_ticks(&self) -> u64 {
        self.stats.lock().slow_ticks
    }

    /// Duration of the most recent tick (ms).
    #[must_use]
    pub fn last_ms(&self) -> f64 {
        self.stats.lock().last_ms
    }

    /// Slowest tick seen (ms).
    #[must_use]
    pub fn worst_ms(&self) -> f64 {
        self.stats.lock().worst_ms
    }

    /// The configured budget (ms).
    #[must_use]
    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }
}

// ---------------------------------------------------------------------------
// Tracing Span Names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::span!`.
pub mod spans {
    /// Per-tick reconciliation of one agent.
    pub const RECONCILE: &str = "kenn::reconcile";
    /// Pending-destruction sweep of one agent.
    pub const SWEEP: &str = "kenn::sweep";
    /// Agent teardown.
    pub const TEARDOWN: &str = "kenn::teardown";
    /// Whole tick across all agents.
    pub const TICK: &str = "kenn::tick";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_default_zero() {
        let snap = InterestCounters::new().snapshot();
        assert_eq!(snap.edges_added, 0);
        assert_eq!(snap.teardowns, 0);
    }

    #[test]
    fn counters_increment_and_snapshot() {
        let c = InterestCounters::new();
        InterestCounters::bump(&c.edges_added);
        InterestCounters::bump(&c.edges_added);
        InterestCounters::bump(&c.inversions);
        let snap = c.snapshot();
        assert_eq!(snap.edges_added, 2);
        assert_eq!(snap.inversions, 1);
        assert_eq!(snap.edges_rejected, 0);
    }

    #[test]
    fn prometheus_format_valid() {
        let c = InterestCounters::new();
        c.pending_expired.fetch_add(3, Ordering::Relaxed);
        let prom = c.snapshot().to_prometheus();
        assert!(prom.contains("kenn_pending_total{outcome=\"expired\"} 3"));
        assert!(prom.contains("# TYPE kenn_teardowns_total counter"));
    }

    #[test]
    fn monitor_counts_slow_ticks_and_keeps_worst() {
        let monitor = TickBudgetMonitor::new(2.0);
        assert!(!monitor.record(Duration::from_micros(500)));
        assert!(monitor.record(Duration::from_millis(3)));
        assert!(!monitor.record(Duration::from_millis(1)));

        assert_eq!(monitor.ticks(), 3);
        assert_eq!(monitor.slow_ticks(), 1);
        assert!((monitor.last_ms() - 1.0).abs() < 1e-9);
        assert!((monitor.worst_ms() - 3.0).abs() < 1e-9);
    }
}
