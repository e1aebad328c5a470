//! # Mailbox
//!
//! Single slot cell used to share the latest value of something between a background thread (or
//! an operator trigger) and the tick loop. Readers always see the most recently published value,
//! there is no queueing and no notification.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared single value cell.
///
/// Cloning a mailbox gives another handle to the same slot.
#[derive(Debug, Default)]
pub struct Mailbox<T> {
    slot: Arc<Mutex<T>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> Mailbox<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(value)),
        }
    }

    /// Replace the value in the mailbox.
    pub fn publish(&self, value: T) {
        *self.lock() = value;
    }

    /// Modify the value in place, returning whatever the closure returns.
    pub fn update<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        f(&mut *self.lock())
    }

    /// Read the value in place without cloning it.
    pub fn read<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
        f(&*self.lock())
    }

    /// A writer panicking half way through an update leaves the last value it wrote, which is
    /// still a valid value for every type shared this way, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, T> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Mailbox<T> {
    /// Get a copy of the most recently published value.
    pub fn latest(&self) -> T {
        self.lock().clone()
    }
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
