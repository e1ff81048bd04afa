//! Long-lived owner of a handle factory.
//!
//! A [`HandleProvider`] is built once at application start. It shares the
//! factory, options and observers with every [`LifecycleManager`] it creates,
//! one manager per unit of work.

use std::fmt;
#[cfg(feature = "async")]
use std::future::Future;
use std::sync::Arc;

use crate::config::ConfigProvider;
use crate::observer::{LifecycleObserver, Observers};
use crate::traits::HandleFactory;
use crate::{LifecycleManager, LifecycleOptions, LifecycleResult};

/// Root provider that hands out one [`LifecycleManager`] per unit of work.
///
/// Cloning is cheap; clones share the factory and configuration.
///
/// # Examples
///
/// ```
/// use scoped_handles::{BoxError, HandleFactory, HandleProvider, LifecycleOptions, PrimaryHandle, StatelessHandle};
/// use std::sync::Arc;
///
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
/// let provider = HandleProvider::new(Sessions)
///     .with_options(LifecycleOptions::default().with_flush_on_close(true));
///
/// // Two requests get independent handles
/// let first = provider.create_manager();
/// let second = provider.create_manager();
/// assert!(!Arc::ptr_eq(&first.primary().unwrap(), &second.primary().unwrap()));
///
/// // `using` closes the manager on every exit path
/// let answer = provider.using(|manager| {
///     let _session = manager.primary()?;
///     Ok::<_, scoped_handles::LifecycleError>(42)
/// });
/// assert_eq!(answer.unwrap(), 42);
/// ```
pub struct HandleProvider<F: HandleFactory> {
    inner: Arc<ProviderInner<F>>,
}

struct ProviderInner<F> {
    factory: Arc<F>,
    options: LifecycleOptions,
    observers: Observers,
}

impl<F: HandleFactory> HandleProvider<F> {
    /// Creates a provider with default options.
    pub fn new(factory: F) -> Self {
        Self::from_arc(Arc::new(factory))
    }

    /// Creates a provider around a factory that is already shared.
    pub fn from_arc(factory: Arc<F>) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                factory,
                options: LifecycleOptions::default(),
                observers: Observers::new(),
            }),
        }
    }

    /// Creates a provider whose options are loaded from configuration.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::InvalidConfiguration`](crate::LifecycleError::InvalidConfiguration)
    /// if a configured value has the wrong type.
    pub fn from_config(factory: F, config: &ConfigProvider) -> LifecycleResult<Self> {
        let options = LifecycleOptions::load(config)?;
        Ok(Self::new(factory).with_options(options))
    }

    /// Replaces the options used for managers created from now on.
    pub fn with_options(self, options: LifecycleOptions) -> Self {
        self.rebuild(|inner| inner.options = options)
    }

    /// Adds an observer shared by every manager created from now on.
    pub fn with_observer(self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.rebuild(|inner| inner.observers.add(observer))
    }

    fn rebuild(self, edit: impl FnOnce(&mut ProviderInner<F>)) -> Self {
        let mut inner = ProviderInner {
            factory: self.inner.factory.clone(),
            options: self.inner.options,
            observers: self.inner.observers.clone(),
        };
        edit(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn options(&self) -> &LifecycleOptions {
        &self.inner.options
    }

    pub fn factory(&self) -> &Arc<F> {
        &self.inner.factory
    }

    /// Creates the manager for a new unit of work.
    ///
    /// The caller owns it and must close it when the unit of work ends;
    /// dropping it also closes it. Prefer [`using`](Self::using) when the unit
    /// of work is a single block.
    pub fn create_manager(&self) -> LifecycleManager<F> {
        let inner = &self.inner;
        LifecycleManager::from_parts(
            inner.factory.clone(),
            inner.options.flush_on_close,
            inner.observers.clone().for_options(&inner.options),
        )
    }

    /// Runs `f` as one unit of work and closes its manager afterwards.
    ///
    /// The manager is closed whether `f` returns `Ok`, returns `Err` or
    /// panics, and the result of `f` is returned untouched.
    pub fn using<R, E, U>(&self, f: U) -> Result<R, E>
    where
        U: FnOnce(&LifecycleManager<F>) -> Result<R, E>,
    {
        let manager = self.create_manager();
        let result = f(&manager);
        manager.close();
        result
    }

    /// Async variant of [`using`](Self::using).
    ///
    /// The manager is passed as an `Arc` so it can be moved into spawned tasks
    /// that share the unit of work. It is closed when the future completes,
    /// or released on drop if the future is cancelled.
    #[cfg(feature = "async")]
    pub async fn using_async<R, E, U, Fut>(&self, f: U) -> Result<R, E>
    where
        U: FnOnce(Arc<LifecycleManager<F>>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let manager = Arc::new(self.create_manager());
        let result = f(manager.clone()).await;
        manager.close();
        result
    }
}

impl<F: HandleFactory> Clone for HandleProvider<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<F: HandleFactory> fmt::Debug for HandleProvider<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleProvider")
            .field("options", &self.inner.options)
            .field("observers", &self.inner.observers.len())
            .finish()
    }
}
