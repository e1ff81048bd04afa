//! Error types for handle lifecycle management.

use thiserror::Error;

use crate::HandleKind;

/// Error type produced by handle factories and primary-handle flushes.
///
/// Collaborators report failures as boxed errors; the manager never inspects
/// them, it only carries them to the caller (factory failures) or to the
/// observers (flush failures).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Lifecycle management errors
///
/// Represents the failures a caller of the manager can observe. Teardown
/// failures are deliberately absent: they are reported as [`FlushFailure`]
/// through the observers and never returned.
///
/// # Examples
///
/// ```rust
/// use scoped_handles::{HandleKind, LifecycleError};
///
/// let disposed = LifecycleError::Disposed(HandleKind::Primary);
/// assert_eq!(disposed.to_string(), "Cannot obtain primary handle: manager is closed");
///
/// let invalid = LifecycleError::InvalidConfiguration("handle factory is required".into());
/// assert!(invalid.to_string().contains("handle factory is required"));
/// ```
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A required dependency was missing or a configuration value was malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A handle was requested after the manager was closed
    #[error("Cannot obtain {0} handle: manager is closed")]
    Disposed(HandleKind),
    /// The factory failed to construct a handle; the slot stays empty
    #[error("Factory failed to create {kind} handle: {source}")]
    Factory {
        kind: HandleKind,
        #[source]
        source: BoxError,
    },
}

impl LifecycleError {
    /// Returns true if this error signals use of a closed manager.
    pub fn is_disposed(&self) -> bool {
        matches!(self, LifecycleError::Disposed(_))
    }

    /// Returns the factory's own error, unchanged, if this is a factory failure.
    ///
    /// ```rust
    /// use scoped_handles::{HandleKind, LifecycleError};
    /// use std::io;
    ///
    /// let err = LifecycleError::Factory {
    ///     kind: HandleKind::Stateless,
    ///     source: Box::new(io::Error::new(io::ErrorKind::Other, "pool exhausted")),
    /// };
    /// let source = err.into_factory_error().unwrap();
    /// assert!(source.downcast_ref::<io::Error>().is_some());
    /// ```
    pub fn into_factory_error(self) -> Option<BoxError> {
        match self {
            LifecycleError::Factory { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// A failure captured while flushing the primary handle during teardown.
///
/// Never returned from `close()`; handed to
/// [`LifecycleObserver::flush_failed`](crate::LifecycleObserver::flush_failed).
#[derive(Debug, Error)]
pub enum FlushFailure {
    /// `flush()` returned an error
    #[error("flush failed: {0}")]
    Error(#[source] BoxError),
    /// `is_open()` or `flush()` panicked
    #[error("flush panicked: {0}")]
    Panicked(String),
}
