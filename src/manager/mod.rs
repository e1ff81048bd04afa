//! Per-unit-of-work handle ownership and teardown.
//!
//! This module contains [`LifecycleManager`], which lazily creates at most one
//! primary and one stateless handle from a shared factory and retires them
//! when the unit of work ends.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::FlushFailure;
use crate::internal::{catch_panic, LazySlot};
use crate::observer::{CloseReport, FlushOutcome, Observers};
use crate::traits::{HandleFactory, PrimaryHandle, StatelessHandle};
use crate::{HandleKind, LifecycleError, LifecycleOptions, LifecycleResult};

mod builder;

pub use builder::LifecycleManagerBuilder;

/// Owner of the handles used by one unit of work.
///
/// A manager is created when a unit of work (typically one request) starts and
/// closed when it ends. Concurrent consumers inside that unit of work share it
/// by reference or through an `Arc`; each of them gets the same primary handle
/// and the same stateless handle, created on first use.
///
/// # Lifetime
///
/// - **Active**: [`primary`](Self::primary) and [`stateless`](Self::stateless)
///   construct on first call and return the cached `Arc` afterwards.
/// - **Closed**: after [`close`](Self::close) both return
///   [`LifecycleError::Disposed`]. Closing again is a no-op.
///
/// Dropping an active manager closes it.
///
/// # Examples
///
/// ```
/// use scoped_handles::{BoxError, HandleFactory, LifecycleManager, LifecycleOptions, PrimaryHandle, StatelessHandle};
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct Session;
/// impl PrimaryHandle for Session {
///     fn is_open(&self) -> bool { true }
///     fn flush(&self) -> Result<(), BoxError> { Ok(()) }
///     fn release(&self) {}
/// }
///
/// struct Reader;
/// impl StatelessHandle for Reader {
///     fn release(&self) {}
/// }
///
/// struct Sessions;
/// impl HandleFactory for Sessions {
///     type Primary = Session;
///     type Stateless = Reader;
///     fn make_primary(&self) -> Result<Session, BoxError> { Ok(Session) }
///     fn make_stateless(&self) -> Result<Reader, BoxError> { Ok(Reader) }
/// }
///
/// let manager = LifecycleManager::new(Arc::new(Sessions), LifecycleOptions::default());
///
/// let a = manager.primary().unwrap();
/// let b = manager.primary().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// manager.close();
/// assert!(manager.primary().unwrap_err().is_disposed());
/// ```
pub struct LifecycleManager<F: HandleFactory> {
    factory: Arc<F>,
    flush_on_close: bool,
    primary: LazySlot<F::Primary>,
    stateless: LazySlot<F::Stateless>,
    closed: AtomicBool,
    observers: Observers,
}

impl<F: HandleFactory> LifecycleManager<F> {
    /// Creates a manager for a factory that is known to be present.
    ///
    /// Use [`builder`](Self::builder) when the factory is optional at the call
    /// site or custom observers are needed.
    pub fn new(factory: Arc<F>, options: LifecycleOptions) -> Self {
        Self::from_parts(factory, options.flush_on_close, Observers::new().for_options(&options))
    }

    /// Starts building a manager.
    pub fn builder() -> LifecycleManagerBuilder<F> {
        LifecycleManagerBuilder::new()
    }

    pub(crate) fn from_parts(factory: Arc<F>, flush_on_close: bool, observers: Observers) -> Self {
        Self {
            factory,
            flush_on_close,
            primary: LazySlot::new(),
            stateless: LazySlot::new(),
            closed: AtomicBool::new(false),
            observers,
        }
    }

    /// Returns the primary handle, creating it on first use.
    ///
    /// Every call on the same manager returns the same `Arc`. Under concurrent
    /// first calls the factory runs exactly once; the other callers wait on
    /// the primary slot's lock and then observe the published handle.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Disposed`] once the manager is closed.
    /// - [`LifecycleError::Factory`] if the factory fails. Nothing is cached,
    ///   so the next call tries again.
    pub fn primary(&self) -> LifecycleResult<Arc<F::Primary>> {
        self.obtain(HandleKind::Primary, &self.primary, || self.factory.make_primary())
    }

    /// Returns the stateless handle, creating it on first use.
    ///
    /// Same contract as [`primary`](Self::primary) with an independent slot and
    /// lock.
    pub fn stateless(&self) -> LifecycleResult<Arc<F::Stateless>> {
        self.obtain(HandleKind::Stateless, &self.stateless, || self.factory.make_stateless())
    }

    /// Whether [`close`](Self::close) has started.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether teardown will flush an open primary handle.
    pub fn flush_on_close(&self) -> bool {
        self.flush_on_close
    }

    /// The factory shared with other managers.
    pub fn factory(&self) -> &Arc<F> {
        &self.factory
    }

    fn peek<T>(&self, kind: HandleKind, slot: &LazySlot<T>) -> LifecycleResult<Option<Arc<T>>> {
        if self.is_closed() {
            return Err(LifecycleError::Disposed(kind));
        }
        Ok(slot.get())
    }

    #[cfg(feature = "async")]
    pub(crate) fn cached_primary(&self) -> LifecycleResult<Option<Arc<F::Primary>>> {
        self.peek(HandleKind::Primary, &self.primary)
    }

    #[cfg(feature = "async")]
    pub(crate) fn cached_stateless(&self) -> LifecycleResult<Option<Arc<F::Stateless>>> {
        self.peek(HandleKind::Stateless, &self.stateless)
    }

    fn obtain<T, M>(&self, kind: HandleKind, slot: &LazySlot<T>, make: M) -> LifecycleResult<Arc<T>>
    where
        M: FnOnce() -> Result<T, crate::BoxError>,
    {
        if let Some(handle) = self.peek(kind, slot)? {
            return Ok(handle);
        }

        let guard = slot.lock();
        // close() may have run while we waited for the lock
        if self.is_closed() {
            return Err(LifecycleError::Disposed(kind));
        }
        if let Some(handle) = guard.get() {
            return Ok(handle);
        }

        let started = Instant::now();
        let handle = match make() {
            Ok(handle) => Arc::new(handle),
            Err(source) => {
                self.observers.handle_creation_failed(kind, &*source);
                return Err(LifecycleError::Factory { kind, source });
            }
        };
        guard.publish(handle.clone());
        drop(guard);

        self.observers.handle_created(kind, started.elapsed());
        Ok(handle)
    }

    /// Retires the unit of work.
    ///
    /// In order: mark the manager closed, flush the primary handle if the
    /// policy asks for it and the handle is open, release the primary handle,
    /// release the stateless handle. Slots that were never populated are left
    /// alone and nothing is constructed.
    ///
    /// Flush errors and panics from `is_open`, `flush` or `release` are
    /// reported to the observers and never escape, so `close` is safe to call
    /// while unwinding from the error that ended the unit of work. Calling it
    /// again is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut report = CloseReport {
            flush: FlushOutcome::Skipped,
            primary_released: false,
            stateless_released: false,
        };

        // take() waits for an in-flight construction, which then gets released here
        if let Some(primary) = self.primary.take() {
            if self.flush_on_close {
                report.flush = self.flush_best_effort(primary.as_ref());
            }
            self.release(HandleKind::Primary, || primary.release());
            report.primary_released = true;
        }

        if let Some(stateless) = self.stateless.take() {
            self.release(HandleKind::Stateless, || stateless.release());
            report.stateless_released = true;
        }

        self.observers.closed(&report);
    }

    fn flush_best_effort(&self, primary: &F::Primary) -> FlushOutcome {
        let started = Instant::now();
        let attempt = catch_panic(|| {
            if !primary.is_open() {
                return Ok(false);
            }
            primary.flush().map(|()| true)
        });

        match attempt {
            Ok(Ok(false)) => FlushOutcome::NotOpen,
            Ok(Ok(true)) => {
                self.observers.flushed(started.elapsed());
                FlushOutcome::Flushed
            }
            Ok(Err(source)) => {
                self.observers.flush_failed(&FlushFailure::Error(source));
                FlushOutcome::Failed
            }
            Err(message) => {
                self.observers.flush_failed(&FlushFailure::Panicked(message));
                FlushOutcome::Failed
            }
        }
    }

    fn release<R: FnOnce()>(&self, kind: HandleKind, release: R) {
        match catch_panic(release) {
            Ok(()) => self.observers.handle_released(kind),
            Err(message) => self.observers.release_panicked(kind, &message),
        }
    }
}

impl<F: HandleFactory> Drop for LifecycleManager<F> {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if self.primary.is_populated() || self.stateless.is_populated() {
            tracing::warn!("lifecycle manager dropped without close(); releasing its handles");
        }
        self.close();
    }
}

impl<F: HandleFactory> fmt::Debug for LifecycleManager<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("flush_on_close", &self.flush_on_close)
            .field("closed", &self.is_closed())
            .field("primary", &self.primary.is_populated())
            .field("stateless", &self.stateless.is_populated())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxError;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counters {
        made: AtomicUsize,
        flushed: AtomicUsize,
        released: AtomicUsize,
    }

    struct Conn(Arc<Counters>);

    impl PrimaryHandle for Conn {
        fn is_open(&self) -> bool {
            true
        }

        fn flush(&self) -> Result<(), BoxError> {
            self.0.flushed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release(&self) {
            self.0.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl StatelessHandle for Conn {
        fn release(&self) {
            self.0.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Factory(Arc<Counters>);

    impl HandleFactory for Factory {
        type Primary = Conn;
        type Stateless = Conn;

        fn make_primary(&self) -> Result<Conn, BoxError> {
            self.0.made.fetch_add(1, Ordering::SeqCst);
            Ok(Conn(self.0.clone()))
        }

        fn make_stateless(&self) -> Result<Conn, BoxError> {
            self.0.made.fetch_add(1, Ordering::SeqCst);
            Ok(Conn(self.0.clone()))
        }
    }

    fn manager(flush: bool) -> (LifecycleManager<Factory>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let options = LifecycleOptions::default().with_flush_on_close(flush).with_logging(false);
        (LifecycleManager::new(Arc::new(Factory(counters.clone())), options), counters)
    }

    #[test]
    fn test_close_takes_both_slots() {
        let (manager, counters) = manager(true);
        manager.primary().unwrap();
        manager.stateless().unwrap();

        manager.close();

        assert!(!manager.primary.is_populated());
        assert!(!manager.stateless.is_populated());
        assert_eq!(counters.made.load(Ordering::SeqCst), 2);
        // stateless handles are never flushed
        assert_eq!(counters.flushed.load(Ordering::SeqCst), 1);
        assert_eq!(counters.released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_closes() {
        let (manager, counters) = manager(false);
        manager.stateless().unwrap();
        drop(manager);

        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        assert_eq!(counters.flushed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_debug_reports_state() {
        let (manager, _counters) = manager(true);
        manager.primary().unwrap();

        let debug = format!("{:?}", manager);
        assert!(debug.contains("flush_on_close: true"));
        assert!(debug.contains("primary: true"));
        assert!(debug.contains("stateless: false"));
    }
}
