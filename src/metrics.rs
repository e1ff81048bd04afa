//! Metrics collection for handle lifecycles.
//!
//! [`MetricsObserver`] is a [`LifecycleObserver`] that counts lifecycle events
//! across every manager it is attached to. Attach one instance to a
//! [`HandleProvider`](crate::HandleProvider) to get process-wide numbers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::FlushFailure;
use crate::observer::{CloseReport, LifecycleObserver};
use crate::HandleKind;

/// Construction timing for one handle kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingStats {
    /// Number of successful constructions
    pub count: u64,
    /// Fastest construction
    pub min_duration: Duration,
    /// Slowest construction
    pub max_duration: Duration,
    /// Total accumulated time
    pub total_duration: Duration,
}

impl TimingStats {
    fn new() -> Self {
        Self {
            count: 0,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
            total_duration: Duration::ZERO,
        }
    }

    fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.min_duration = self.min_duration.min(duration);
        self.max_duration = self.max_duration.max(duration);
        self.total_duration += duration;
    }

    /// Average construction time
    pub fn average_duration(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_duration.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

#[derive(Default)]
struct KindCounters {
    created: AtomicU64,
    creation_failures: AtomicU64,
    released: AtomicU64,
    release_panics: AtomicU64,
}

impl KindCounters {
    fn snapshot(&self) -> KindMetrics {
        KindMetrics {
            created: self.created.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            release_panics: self.release_panics.load(Ordering::Relaxed),
        }
    }
}

/// Counters for one handle kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindMetrics {
    pub created: u64,
    pub creation_failures: u64,
    pub released: u64,
    pub release_panics: u64,
}

impl KindMetrics {
    /// Handles created and not yet released or lost to a panicking release.
    pub fn live(&self) -> u64 {
        self.created.saturating_sub(self.released + self.release_panics)
    }
}

/// Point-in-time copy of a [`MetricsObserver`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleMetrics {
    pub primary: KindMetrics,
    pub stateless: KindMetrics,
    pub flushes: u64,
    pub flush_failures: u64,
    pub closes: u64,
    pub primary_timing: TimingStats,
    pub stateless_timing: TimingStats,
}

impl LifecycleMetrics {
    pub fn kind(&self, kind: HandleKind) -> &KindMetrics {
        match kind {
            HandleKind::Primary => &self.primary,
            HandleKind::Stateless => &self.stateless,
        }
    }
}

/// Observer that counts lifecycle events
///
/// # Examples
///
/// ```
/// use scoped_handles::{HandleKind, LifecycleObserver, MetricsObserver};
/// use std::time::Duration;
///
/// let metrics = MetricsObserver::new();
/// metrics.handle_created(HandleKind::Primary, Duration::from_millis(3));
/// metrics.handle_released(HandleKind::Primary);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.primary.created, 1);
/// assert_eq!(snapshot.primary.live(), 0);
/// assert!(metrics.export_prometheus().contains("scoped_handles_created_total{kind=\"primary\"} 1"));
/// ```
pub struct MetricsObserver {
    primary: KindCounters,
    stateless: KindCounters,
    flushes: AtomicU64,
    flush_failures: AtomicU64,
    closes: AtomicU64,
    timings: Mutex<[TimingStats; 2]>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self {
            primary: KindCounters::default(),
            stateless: KindCounters::default(),
            flushes: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            closes: AtomicU64::new(0),
            timings: Mutex::new([TimingStats::new(), TimingStats::new()]),
        }
    }

    fn counters(&self, kind: HandleKind) -> &KindCounters {
        match kind {
            HandleKind::Primary => &self.primary,
            HandleKind::Stateless => &self.stateless,
        }
    }

    fn timing_index(kind: HandleKind) -> usize {
        match kind {
            HandleKind::Primary => 0,
            HandleKind::Stateless => 1,
        }
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> LifecycleMetrics {
        let timings = *self.timings.lock();
        LifecycleMetrics {
            primary: self.primary.snapshot(),
            stateless: self.stateless.snapshot(),
            flushes: self.flushes.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            closes: self.closes.load(Ordering::Relaxed),
            primary_timing: timings[0],
            stateless_timing: timings[1],
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        let per_kind: [(&str, &str, fn(&KindMetrics) -> u64); 4] = [
            ("created_total", "Handles created by the factory", |m| m.created),
            ("creation_failures_total", "Factory failures", |m| m.creation_failures),
            ("released_total", "Handles released on close", |m| m.released),
            ("release_panics_total", "Handle releases that panicked", |m| m.release_panics),
        ];
        for (name, help, value) in per_kind {
            output.push_str(&format!(
                "# HELP scoped_handles_{name} {help}\n# TYPE scoped_handles_{name} counter\n"
            ));
            for kind in HandleKind::ALL {
                output.push_str(&format!(
                    "scoped_handles_{name}{{kind=\"{kind}\"}} {}\n",
                    value(snapshot.kind(kind))
                ));
            }
            output.push('\n');
        }

        for (name, help, value) in [
            ("flushes_total", "Successful flushes on close", snapshot.flushes),
            ("flush_failures_total", "Flushes on close that failed", snapshot.flush_failures),
            ("closes_total", "Managers closed", snapshot.closes),
        ] {
            output.push_str(&format!(
                "# HELP scoped_handles_{name} {help}\n# TYPE scoped_handles_{name} counter\nscoped_handles_{name} {value}\n\n"
            ));
        }

        output.push_str(
            "# HELP scoped_handles_creation_duration_seconds Time spent in the factory\n\
            # TYPE scoped_handles_creation_duration_seconds summary\n",
        );
        for (kind, timing) in [
            (HandleKind::Primary, snapshot.primary_timing),
            (HandleKind::Stateless, snapshot.stateless_timing),
        ] {
            output.push_str(&format!(
                "scoped_handles_creation_duration_seconds_sum{{kind=\"{kind}\"}} {}\n\
                scoped_handles_creation_duration_seconds_count{{kind=\"{kind}\"}} {}\n",
                timing.total_duration.as_secs_f64(),
                timing.count
            ));
        }

        output
    }
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for MetricsObserver {
    fn handle_created(&self, kind: HandleKind, duration: Duration) {
        self.counters(kind).created.fetch_add(1, Ordering::Relaxed);
        self.timings.lock()[Self::timing_index(kind)].record(duration);
    }

    fn handle_creation_failed(&self, kind: HandleKind, _error: &(dyn std::error::Error + 'static)) {
        self.counters(kind).creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn flushed(&self, _duration: Duration) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    fn flush_failed(&self, _failure: &FlushFailure) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn handle_released(&self, kind: HandleKind) {
        self.counters(kind).released.fetch_add(1, Ordering::Relaxed);
    }

    fn release_panicked(&self, kind: HandleKind, _message: &str) {
        self.counters(kind).release_panics.fetch_add(1, Ordering::Relaxed);
    }

    fn closed(&self, _report: &CloseReport) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }
}
