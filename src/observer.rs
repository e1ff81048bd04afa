//! Diagnostic observers for handle lifecycle events.
//!
//! Observers are the diagnostics channel of a manager. Teardown failures that
//! are never returned to the caller (flush errors, panicking collaborators)
//! are delivered here, next to the ordinary creation and release events.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FlushFailure;
use crate::internal::catch_panic;
use crate::{HandleKind, LifecycleOptions};

/// What happened to the primary handle's pending state during teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No flush was attempted: no primary handle existed or the policy is off
    Skipped,
    /// The handle reported itself closed, so nothing was flushed
    NotOpen,
    /// The flush completed
    Flushed,
    /// The flush failed or panicked; the failure went to `flush_failed`
    Failed,
}

/// Summary of one teardown, delivered once to [`LifecycleObserver::closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReport {
    /// Outcome of the flush step
    pub flush: FlushOutcome,
    /// Whether a primary handle existed and was released
    pub primary_released: bool,
    /// Whether a stateless handle existed and was released
    pub stateless_released: bool,
}

impl CloseReport {
    /// Number of handles released by this teardown.
    pub fn released_count(&self) -> usize {
        usize::from(self.primary_released) + usize::from(self.stateless_released)
    }
}

/// Observer trait for handle lifecycle events.
///
/// Every method has an empty default body so implementations only override
/// what they care about. Calls are made synchronously from the manager,
/// including from inside teardown, so keep implementations lightweight.
/// A panic inside a method is caught, logged and does not reach the manager.
///
/// # Examples
///
/// ```
/// use scoped_handles::{FlushFailure, HandleKind, LifecycleObserver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct FlushAlarm {
///     failures: AtomicUsize,
/// }
///
/// impl LifecycleObserver for FlushAlarm {
///     fn flush_failed(&self, failure: &FlushFailure) {
///         self.failures.fetch_add(1, Ordering::SeqCst);
///         eprintln!("pending changes lost: {}", failure);
///     }
///
///     fn handle_created(&self, kind: HandleKind, duration: Duration) {
///         println!("opened {} handle in {:?}", kind, duration);
///     }
/// }
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// Called after the factory produced a handle and it was stored.
    fn handle_created(&self, _kind: HandleKind, _duration: Duration) {}

    /// Called when the factory failed; the error is also returned to the caller.
    fn handle_creation_failed(&self, _kind: HandleKind, _error: &(dyn std::error::Error + 'static)) {}

    /// Called after a successful teardown flush of the primary handle.
    fn flushed(&self, _duration: Duration) {}

    /// Called when the teardown flush failed. The failure goes nowhere else.
    fn flush_failed(&self, _failure: &FlushFailure) {}

    /// Called after a handle was released during teardown.
    fn handle_released(&self, _kind: HandleKind) {}

    /// Called when a handle's `release()` panicked; teardown continued.
    fn release_panicked(&self, _kind: HandleKind, _message: &str) {}

    /// Called once at the end of the first `close()`.
    fn closed(&self, _report: &CloseReport) {}
}

/// Container for registered observers.
///
/// Empty means diagnostics are no-ops.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    /// Adds the tracing observer when the options enable logging.
    pub(crate) fn for_options(mut self, options: &LifecycleOptions) -> Self {
        if options.enable_logging {
            self.add(Arc::new(TracingObserver::new()));
        }
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Deliver one event to every observer. A panicking observer is logged
    /// and skipped so it never interrupts the manager.
    fn notify(&self, event: &'static str, deliver: impl Fn(&dyn LifecycleObserver)) {
        for observer in &self.observers {
            if let Err(message) = catch_panic(|| deliver(observer.as_ref())) {
                tracing::error!(event, panic = %message, "lifecycle observer panicked");
            }
        }
    }

    #[inline]
    pub(crate) fn handle_created(&self, kind: HandleKind, duration: Duration) {
        self.notify("handle_created", |o| o.handle_created(kind, duration));
    }

    #[inline]
    pub(crate) fn handle_creation_failed(&self, kind: HandleKind, error: &(dyn std::error::Error + 'static)) {
        self.notify("handle_creation_failed", |o| o.handle_creation_failed(kind, error));
    }

    #[inline]
    pub(crate) fn flushed(&self, duration: Duration) {
        self.notify("flushed", |o| o.flushed(duration));
    }

    #[inline]
    pub(crate) fn flush_failed(&self, failure: &FlushFailure) {
        self.notify("flush_failed", |o| o.flush_failed(failure));
    }

    #[inline]
    pub(crate) fn handle_released(&self, kind: HandleKind) {
        self.notify("handle_released", |o| o.handle_released(kind));
    }

    #[inline]
    pub(crate) fn release_panicked(&self, kind: HandleKind, message: &str) {
        self.notify("release_panicked", |o| o.release_panicked(kind, message));
    }

    #[inline]
    pub(crate) fn closed(&self, report: &CloseReport) {
        self.notify("closed", |o| o.closed(report));
    }
}

/// Built-in observer that emits `tracing` events.
///
/// Installed automatically when
/// [`LifecycleOptions::enable_logging`](crate::LifecycleOptions) is set.
/// Lifecycle events are `debug`, flush failures `warn`, release panics
/// `error`. Events carry a `scope` field so several providers can share one
/// subscriber.
///
/// # Examples
///
/// ```
/// use scoped_handles::TracingObserver;
///
/// let observer = TracingObserver::with_scope("orders-db");
/// assert_eq!(observer.scope(), "orders-db");
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    scope: String,
}

impl TracingObserver {
    /// Creates a tracing observer with the default scope label.
    pub fn new() -> Self {
        Self {
            scope: "scoped-handles".to_string(),
        }
    }

    /// Creates a tracing observer with a custom scope label.
    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for TracingObserver {
    fn handle_created(&self, kind: HandleKind, duration: Duration) {
        tracing::debug!(scope = %self.scope, kind = %kind, ?duration, "handle created");
    }

    fn handle_creation_failed(&self, kind: HandleKind, error: &(dyn std::error::Error + 'static)) {
        tracing::debug!(scope = %self.scope, kind = %kind, error = %error, "handle creation failed");
    }

    fn flushed(&self, duration: Duration) {
        tracing::debug!(scope = %self.scope, ?duration, "primary handle flushed on close");
    }

    fn flush_failed(&self, failure: &FlushFailure) {
        tracing::warn!(scope = %self.scope, error = %failure, "flush on close failed, releasing handle anyway");
    }

    fn handle_released(&self, kind: HandleKind) {
        tracing::debug!(scope = %self.scope, kind = %kind, "handle released");
    }

    fn release_panicked(&self, kind: HandleKind, message: &str) {
        tracing::error!(scope = %self.scope, kind = %kind, panic = message, "handle release panicked");
    }

    fn closed(&self, report: &CloseReport) {
        tracing::debug!(
            scope = %self.scope,
            flush = ?report.flush,
            released = report.released_count(),
            "lifecycle manager closed"
        );
    }
}
