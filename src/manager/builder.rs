//! Builder for lifecycle managers.

use std::sync::Arc;

use super::LifecycleManager;
use crate::observer::{LifecycleObserver, Observers};
use crate::traits::HandleFactory;
use crate::{LifecycleError, LifecycleOptions, LifecycleResult};

/// Builder for [`LifecycleManager`].
///
/// The factory is required; [`build`](Self::build) fails with
/// [`LifecycleError::InvalidConfiguration`] without one. Observers are
/// optional, and with logging disabled and no observers the manager's
/// diagnostics are no-ops.
///
/// # Examples
///
/// ```
/// use scoped_handles::{BoxError, HandleFactory, LifecycleError, LifecycleManager, PrimaryHandle, StatelessHandle};
/// use std::sync::Arc;
///
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
/// let missing = LifecycleManager::<Sessions>::builder().build();
/// assert!(matches!(missing, Err(LifecycleError::InvalidConfiguration(_))));
///
/// let manager = LifecycleManager::builder()
///     .factory(Arc::new(Sessions))
///     .flush_on_close(true)
///     .build()
///     .unwrap();
/// assert!(manager.flush_on_close());
/// ```
pub struct LifecycleManagerBuilder<F: HandleFactory> {
    factory: Option<Arc<F>>,
    options: LifecycleOptions,
    observers: Observers,
}

impl<F: HandleFactory> LifecycleManagerBuilder<F> {
    pub(crate) fn new() -> Self {
        Self {
            factory: None,
            options: LifecycleOptions::default(),
            observers: Observers::new(),
        }
    }

    /// Sets the handle factory.
    pub fn factory(mut self, factory: Arc<F>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets the factory if one is available.
    pub fn maybe_factory(mut self, factory: Option<Arc<F>>) -> Self {
        self.factory = factory;
        self
    }

    /// Replaces all options.
    pub fn options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the flush-on-close policy.
    pub fn flush_on_close(mut self, enabled: bool) -> Self {
        self.options.flush_on_close = enabled;
        self
    }

    /// Enables or disables the built-in tracing observer.
    pub fn logging(mut self, enabled: bool) -> Self {
        self.options.enable_logging = enabled;
        self
    }

    /// Adds a diagnostics observer.
    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    /// Builds the manager.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidConfiguration`] if no factory was supplied.
    pub fn build(self) -> LifecycleResult<LifecycleManager<F>> {
        let factory = self.factory.ok_or_else(|| {
            LifecycleError::InvalidConfiguration("handle factory is required".to_string())
        })?;
        let observers = self.observers.for_options(&self.options);
        Ok(LifecycleManager::from_parts(factory, self.options.flush_on_close, observers))
    }
}

impl<F: HandleFactory> Default for LifecycleManagerBuilder<F> {
    fn default() -> Self {
        Self::new()
    }
}
