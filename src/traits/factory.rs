//! Factory trait for producing handles on demand.

use crate::traits::{PrimaryHandle, StatelessHandle};
use crate::BoxError;

/// Long-lived producer of primary and stateless handles.
///
/// A factory is typically built once at application start and shared by every
/// unit of work through an `Arc`. Construction is synchronous and may block;
/// the manager calls it while holding the lock of the slot being filled, so
/// each method runs at most once per manager and slot unless it fails.
///
/// # Examples
///
/// ```
/// use scoped_handles::{BoxError, HandleFactory, PrimaryHandle, StatelessHandle};
///
/// struct Connection;
/// impl PrimaryHandle for Connection {
///     fn is_open(&self) -> bool { true }
///     fn flush(&self) -> Result<(), BoxError> { Ok(()) }
///     fn release(&self) {}
/// }
///
/// struct Cursor;
/// impl StatelessHandle for Cursor {
///     fn release(&self) {}
/// }
///
/// struct Database {
///     url: String,
/// }
///
/// impl HandleFactory for Database {
///     type Primary = Connection;
///     type Stateless = Cursor;
///
///     fn make_primary(&self) -> Result<Connection, BoxError> {
///         if self.url.is_empty() {
///             return Err("connection url is empty".into());
///         }
///         Ok(Connection)
///     }
///
///     fn make_stateless(&self) -> Result<Cursor, BoxError> {
///         Ok(Cursor)
///     }
/// }
/// ```
pub trait HandleFactory: Send + Sync + 'static {
    /// Handle type produced for the primary slot.
    type Primary: PrimaryHandle;
    /// Handle type produced for the stateless slot.
    type Stateless: StatelessHandle;

    /// Create a new primary handle.
    fn make_primary(&self) -> Result<Self::Primary, BoxError>;

    /// Create a new stateless handle.
    fn make_stateless(&self) -> Result<Self::Stateless, BoxError>;
}
