//! Lazily populated ownership slot with double-checked construction.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

/// Optional shared value with a dedicated construction lock.
///
/// Readers take the cheap shared read of `value`. Writers serialise on
/// `init`, so at most one caller runs the constructor for a slot at a time.
/// `value` is only written while `init` is held.
pub(crate) struct LazySlot<T> {
    value: RwLock<Option<Arc<T>>>,
    init: Mutex<()>,
}

impl<T> LazySlot<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: RwLock::new(None),
            init: Mutex::new(()),
        }
    }

    /// Fast path: the current value, if any.
    #[inline]
    pub(crate) fn get(&self) -> Option<Arc<T>> {
        self.value.read().clone()
    }

    pub(crate) fn is_populated(&self) -> bool {
        self.value.read().is_some()
    }

    /// Acquire the construction lock for this slot.
    pub(crate) fn lock(&self) -> SlotGuard<'_, T> {
        SlotGuard {
            slot: self,
            _init: self.init.lock(),
        }
    }

    /// Remove the value, waiting for any in-flight construction to finish first.
    pub(crate) fn take(&self) -> Option<Arc<T>> {
        let _init = self.init.lock();
        self.value.write().take()
    }
}

/// Proof that the construction lock of a slot is held.
pub(crate) struct SlotGuard<'a, T> {
    slot: &'a LazySlot<T>,
    _init: MutexGuard<'a, ()>,
}

impl<T> SlotGuard<'_, T> {
    /// Re-check under the lock.
    pub(crate) fn get(&self) -> Option<Arc<T>> {
        self.slot.get()
    }

    /// Publish a freshly constructed value.
    pub(crate) fn publish(&self, value: Arc<T>) {
        *self.slot.value.write() = Some(value);
    }
}
