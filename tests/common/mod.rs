//! Recording factory and handles shared by the integration tests.

#![allow(dead_code)]

use scoped_handles::{
    BoxError, CloseReport, FlushFailure, HandleFactory, HandleKind, LifecycleObserver, PrimaryHandle,
    StatelessHandle,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the primary handle behaves when flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushBehavior {
    Succeed,
    Fail,
    Panic,
}

/// Shared record of every call the manager made on the factory and handles.
#[derive(Debug, Default)]
pub struct Calls {
    pub make_primary: AtomicUsize,
    pub make_stateless: AtomicUsize,
    pub flush: AtomicUsize,
    pub release_primary: AtomicUsize,
    pub release_stateless: AtomicUsize,
    pub events: Mutex<Vec<String>>,
}

impl Calls {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn handle_operations(&self) -> usize {
        Self::count(&self.flush) + Self::count(&self.release_primary) + Self::count(&self.release_stateless)
    }
}

#[derive(Debug)]
pub struct MockSession {
    pub id: usize,
    calls: Arc<Calls>,
    open: AtomicBool,
    flush: FlushBehavior,
    panic_on_release: bool,
}

impl PrimaryHandle for MockSession {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn flush(&self) -> Result<(), BoxError> {
        self.calls.flush.fetch_add(1, Ordering::SeqCst);
        self.calls.record(format!("flush:{}", self.id));
        match self.flush {
            FlushBehavior::Succeed => Ok(()),
            FlushBehavior::Fail => Err("constraint violation on commit".into()),
            FlushBehavior::Panic => panic!("flush exploded"),
        }
    }

    fn release(&self) {
        self.calls.release_primary.fetch_add(1, Ordering::SeqCst);
        self.calls.record(format!("release-primary:{}", self.id));
        if self.panic_on_release {
            panic!("release exploded");
        }
    }
}

#[derive(Debug)]
pub struct MockReader {
    pub id: usize,
    calls: Arc<Calls>,
}

impl StatelessHandle for MockReader {
    fn release(&self) {
        self.calls.release_stateless.fetch_add(1, Ordering::SeqCst);
        self.calls.record(format!("release-stateless:{}", self.id));
    }
}

/// Factory whose behavior is tuned per test.
pub struct MockFactory {
    pub calls: Arc<Calls>,
    pub construct_delay: Option<Duration>,
    pub primary_failures: AtomicUsize,
    pub stateless_failures: AtomicUsize,
    pub flush: FlushBehavior,
    pub open: bool,
    pub panic_on_release: bool,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            construct_delay: None,
            primary_failures: AtomicUsize::new(0),
            stateless_failures: AtomicUsize::new(0),
            flush: FlushBehavior::Succeed,
            open: true,
            panic_on_release: false,
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.construct_delay = Some(delay);
        self
    }

    pub fn failing_primary(self, times: usize) -> Self {
        self.primary_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn failing_stateless(self, times: usize) -> Self {
        self.stateless_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn flush_behavior(mut self, flush: FlushBehavior) -> Self {
        self.flush = flush;
        self
    }

    pub fn closed_handles(mut self) -> Self {
        self.open = false;
        self
    }

    pub fn panicking_release(mut self) -> Self {
        self.panic_on_release = true;
        self
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[derive(Debug)]
pub struct PoolExhausted;

impl std::fmt::Display for PoolExhausted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "connection pool exhausted")
    }
}

impl std::error::Error for PoolExhausted {}

impl HandleFactory for MockFactory {
    type Primary = MockSession;
    type Stateless = MockReader;

    fn make_primary(&self) -> Result<MockSession, BoxError> {
        if let Some(delay) = self.construct_delay {
            std::thread::sleep(delay);
        }
        if Self::take_failure(&self.primary_failures) {
            return Err(Box::new(PoolExhausted));
        }
        let id = self.calls.make_primary.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.record(format!("make-primary:{}", id));
        Ok(MockSession {
            id,
            calls: self.calls.clone(),
            open: AtomicBool::new(self.open),
            flush: self.flush,
            panic_on_release: self.panic_on_release,
        })
    }

    fn make_stateless(&self) -> Result<MockReader, BoxError> {
        if let Some(delay) = self.construct_delay {
            std::thread::sleep(delay);
        }
        if Self::take_failure(&self.stateless_failures) {
            return Err(Box::new(PoolExhausted));
        }
        let id = self.calls.make_stateless.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.record(format!("make-stateless:{}", id));
        Ok(MockReader {
            id,
            calls: self.calls.clone(),
        })
    }
}

/// Observer that keeps every event as text.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
    pub reports: Mutex<Vec<CloseReport>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<CloseReport> {
        self.reports.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl LifecycleObserver for RecordingObserver {
    fn handle_created(&self, kind: HandleKind, _duration: Duration) {
        self.push(format!("created:{}", kind));
    }

    fn handle_creation_failed(&self, kind: HandleKind, error: &(dyn std::error::Error + 'static)) {
        self.push(format!("creation-failed:{}:{}", kind, error));
    }

    fn flushed(&self, _duration: Duration) {
        self.push("flushed".to_string());
    }

    fn flush_failed(&self, failure: &FlushFailure) {
        self.push(format!("flush-failed:{}", failure));
    }

    fn handle_released(&self, kind: HandleKind) {
        self.push(format!("released:{}", kind));
    }

    fn release_panicked(&self, kind: HandleKind, message: &str) {
        self.push(format!("release-panicked:{}:{}", kind, message));
    }

    fn closed(&self, report: &CloseReport) {
        self.reports.lock().unwrap().push(*report);
        self.push("closed".to_string());
    }
}
