//! Internal implementation details.

pub(crate) mod recover;
pub(crate) mod slot;

pub(crate) use recover::catch_panic;
pub(crate) use slot::LazySlot;
