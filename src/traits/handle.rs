//! Handle traits for resources owned by a lifecycle manager.

use crate::BoxError;

/// A stateful, potentially buffering handle.
///
/// Primary handles represent one unit of work's interaction with backing
/// storage. During teardown the manager may ask an open primary handle to
/// flush pending state before it is released.
///
/// Methods take `&self` because the manager hands out shared `Arc`s; handles
/// keep whatever interior state they need behind their own synchronisation.
///
/// # Examples
///
/// ```
/// use scoped_handles::{BoxError, PrimaryHandle};
/// use std::sync::Mutex;
///
/// struct Session {
///     pending: Mutex<Vec<String>>,
///     open: std::sync::atomic::AtomicBool,
/// }
///
/// impl PrimaryHandle for Session {
///     fn is_open(&self) -> bool {
///         self.open.load(std::sync::atomic::Ordering::SeqCst)
///     }
///
///     fn flush(&self) -> Result<(), BoxError> {
///         let mut pending = self.pending.lock().unwrap();
///         println!("committing {} statements", pending.len());
///         pending.clear();
///         Ok(())
///     }
///
///     fn release(&self) {
///         self.open.store(false, std::sync::atomic::Ordering::SeqCst);
///     }
/// }
/// ```
pub trait PrimaryHandle: Send + Sync + 'static {
    /// Whether the handle can still accept a flush.
    fn is_open(&self) -> bool;

    /// Force buffered pending state to be committed.
    fn flush(&self) -> Result<(), BoxError>;

    /// Release the underlying resource.
    ///
    /// The manager calls this at most once per handle. Handles that may be
    /// released elsewhere should tolerate repeated calls themselves.
    fn release(&self);
}

/// A handle without internal buffering.
///
/// Stateless handles are never flushed; teardown only releases them.
///
/// # Examples
///
/// ```
/// use scoped_handles::StatelessHandle;
///
/// struct BulkReader {
///     id: u64,
/// }
///
/// impl StatelessHandle for BulkReader {
///     fn release(&self) {
///         println!("closing bulk reader {}", self.id);
///     }
/// }
/// ```
pub trait StatelessHandle: Send + Sync + 'static {
    /// Release the underlying resource.
    fn release(&self);
}
