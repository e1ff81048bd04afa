//! # scoped-handles
//!
//! Request-scoped lifecycle management for expensive, stateful handles.
//!
//! A long-lived [`HandleFactory`] produces two kinds of handles: a stateful
//! *primary* handle that may buffer pending work, and a *stateless* handle
//! that never does. A [`LifecycleManager`] is created per unit of work and
//! guarantees:
//!
//! - **At most one handle per kind**: lazily created on first use, shared by
//!   every concurrent consumer in the unit of work
//! - **Independent slots**: primary and stateless construction never contend
//! - **Retry on failure**: a failed factory call is not cached
//! - **Deterministic teardown**: optional flush of the primary handle, then
//!   release of both, exactly once
//! - **Quiet but visible cleanup failures**: flush errors never escape
//!   `close()`, they are reported to [`LifecycleObserver`]s instead
//!
//! ## Quick Start
//!
//! ```rust
//! use scoped_handles::{BoxError, HandleFactory, HandleProvider, LifecycleOptions, PrimaryHandle, StatelessHandle};
//! use std::sync::Mutex;
//!
//! struct Session {
//!     pending: Mutex<Vec<String>>,
//! }
//!
//! impl PrimaryHandle for Session {
//!     fn is_open(&self) -> bool { true }
//!     fn flush(&self) -> Result<(), BoxError> {
//!         self.pending.lock().unwrap().clear();
//!         Ok(())
//!     }
//!     fn release(&self) {}
//! }
//!
//! struct Reader;
//! impl StatelessHandle for Reader {
//!     fn release(&self) {}
//! }
//!
//! struct Database;
//! impl HandleFactory for Database {
//!     type Primary = Session;
//!     type Stateless = Reader;
//!     fn make_primary(&self) -> Result<Session, BoxError> {
//!         Ok(Session { pending: Mutex::new(Vec::new()) })
//!     }
//!     fn make_stateless(&self) -> Result<Reader, BoxError> {
//!         Ok(Reader)
//!     }
//! }
//!
//! // Built once at startup
//! let provider = HandleProvider::new(Database)
//!     .with_options(LifecycleOptions::default().with_flush_on_close(true));
//!
//! // One unit of work
//! provider.using(|manager| {
//!     let session = manager.primary()?;
//!     session.pending.lock().unwrap().push("insert into orders ...".to_string());
//!     Ok::<_, scoped_handles::LifecycleError>(())
//! }).unwrap();
//! // The session was flushed and released when `using` returned
//! ```
//!
//! ## Sharing a Unit of Work Across Threads
//!
//! ```rust
//! # use scoped_handles::{BoxError, HandleFactory, HandleProvider, PrimaryHandle, StatelessHandle};
//! # use std::sync::Arc;
//! # struct Session;
//! # impl PrimaryHandle for Session {
//! #     fn is_open(&self) -> bool { true }
//! #     fn flush(&self) -> Result<(), BoxError> { Ok(()) }
//! #     fn release(&self) {}
//! # }
//! # struct Reader;
//! # impl StatelessHandle for Reader { fn release(&self) {} }
//! # struct Database;
//! # impl HandleFactory for Database {
//! #     type Primary = Session;
//! #     type Stateless = Reader;
//! #     fn make_primary(&self) -> Result<Session, BoxError> { Ok(Session) }
//! #     fn make_stateless(&self) -> Result<Reader, BoxError> { Ok(Reader) }
//! # }
//! let provider = HandleProvider::new(Database);
//! let manager = provider.create_manager();
//!
//! let sessions: Vec<Arc<Session>> = std::thread::scope(|s| {
//!     let workers: Vec<_> = (0..4).map(|_| s.spawn(|| manager.primary().unwrap())).collect();
//!     workers.into_iter().map(|w| w.join().unwrap()).collect()
//! });
//! assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
//!
//! manager.close();
//! ```
//!
//! ## Feature Flags
//!
//! - `async`: `primary_async`/`stateless_async` run the factory on tokio's
//!   blocking pool; `HandleProvider::using_async` scopes an async unit of work
//! - `config`: serde support for [`LifecycleOptions`] and a JSON configuration
//!   source

pub mod config;
pub mod error;
pub mod kind;
pub mod manager;
pub mod metrics;
pub mod observer;
pub mod provider;
pub mod traits;

#[cfg(feature = "async")]
mod async_handles;

// Internal modules
mod internal;

pub use config::{ConfigProvider, ConfigSource, ConfigValue, EnvironmentConfigSource, LifecycleOptions, MapConfigSource};
#[cfg(feature = "config")]
pub use config::JsonConfigSource;
pub use error::{BoxError, FlushFailure, LifecycleError, LifecycleResult};
pub use kind::HandleKind;
pub use manager::{LifecycleManager, LifecycleManagerBuilder};
pub use metrics::{KindMetrics, LifecycleMetrics, MetricsObserver, TimingStats};
pub use observer::{CloseReport, FlushOutcome, LifecycleObserver, TracingObserver};
pub use provider::HandleProvider;
pub use traits::{HandleFactory, PrimaryHandle, StatelessHandle};
