//! Handle kind definitions.

use std::fmt;

/// The two handle slots a manager owns
///
/// Each kind has its own slot and its own construction lock, so obtaining a
/// primary handle never waits on stateless construction and vice versa.
///
/// # Examples
///
/// ```rust
/// use scoped_handles::HandleKind;
///
/// assert_eq!(HandleKind::Primary.to_string(), "primary");
/// assert!(HandleKind::Primary.is_flushable());
/// assert!(!HandleKind::Stateless.is_flushable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Stateful handle that may buffer pending work
    ///
    /// Primary handles report whether they are still open and can be flushed
    /// before release when the flush-on-close policy is enabled.
    Primary,
    /// Handle without internal buffering
    ///
    /// Stateless handles are always safe to discard and are never flushed.
    Stateless,
}

impl HandleKind {
    /// Both kinds, in teardown order.
    pub const ALL: [HandleKind; 2] = [HandleKind::Primary, HandleKind::Stateless];

    /// Whether teardown may flush handles of this kind.
    pub fn is_flushable(self) -> bool {
        matches!(self, HandleKind::Primary)
    }

    /// Lowercase label used in log fields and metric names.
    pub fn as_str(self) -> &'static str {
        match self {
            HandleKind::Primary => "primary",
            HandleKind::Stateless => "stateless",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
