//! Async access to handles.
//!
//! Factory calls are synchronous and may block for a long time (opening a
//! connection, running a handshake). Calling [`LifecycleManager::primary`]
//! directly from an async task would stall the executor thread while the
//! factory runs, so these variants move the slow path onto tokio's blocking
//! pool. The cached fast path never leaves the calling task.

use std::panic;
use std::sync::Arc;

use crate::traits::HandleFactory;
use crate::{HandleKind, LifecycleError, LifecycleManager, LifecycleResult};

impl<F: HandleFactory> LifecycleManager<F> {
    /// Async variant of [`primary`](Self::primary).
    ///
    /// # Examples
    ///
    /// ```
    /// # use scoped_handles::{BoxError, HandleFactory, HandleProvider, PrimaryHandle, StatelessHandle};
    /// # use std::sync::Arc;
    /// # struct Session;
    /// # impl PrimaryHandle for Session {
    /// #     fn is_open(&self) -> bool { true }
    /// #     fn flush(&self) -> Result<(), BoxError> { Ok(()) }
    /// #     fn release(&self) {}
    /// # }
    /// # struct Reader;
    /// # impl StatelessHandle for Reader { fn release(&self) {} }
    /// # struct Sessions;
    /// # impl HandleFactory for Sessions {
    /// #     type Primary = Session;
    /// #     type Stateless = Reader;
    /// #     fn make_primary(&self) -> Result<Session, BoxError> { Ok(Session) }
    /// #     fn make_stateless(&self) -> Result<Reader, BoxError> { Ok(Reader) }
    /// # }
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), scoped_handles::LifecycleError> {
    /// let provider = HandleProvider::new(Sessions);
    /// let manager = Arc::new(provider.create_manager());
    ///
    /// let session = manager.primary_async().await?;
    /// assert!(Arc::ptr_eq(&session, &manager.primary()?));
    /// manager.close();
    /// # Ok(())
    /// # }
    /// ```
    pub async fn primary_async(self: &Arc<Self>) -> LifecycleResult<Arc<F::Primary>> {
        if let Some(handle) = self.cached_primary()? {
            return Ok(handle);
        }
        let manager = Arc::clone(self);
        run_blocking(HandleKind::Primary, move || manager.primary()).await
    }

    /// Async variant of [`stateless`](Self::stateless).
    pub async fn stateless_async(self: &Arc<Self>) -> LifecycleResult<Arc<F::Stateless>> {
        if let Some(handle) = self.cached_stateless()? {
            return Ok(handle);
        }
        let manager = Arc::clone(self);
        run_blocking(HandleKind::Stateless, move || manager.stateless()).await
    }
}

async fn run_blocking<T, C>(kind: HandleKind, construct: C) -> LifecycleResult<T>
where
    T: Send + 'static,
    C: FnOnce() -> LifecycleResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(construct).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
        Err(err) => Err(LifecycleError::Factory {
            kind,
            source: Box::new(err),
        }),
    }
}
