//! Shared handles passed between tick processes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reference-counted, lock-guarded value shared between processes.
pub type Shared<T> = Arc<Mutex<T>>;

/// Wrap a value in a [`Shared`] handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Lock a shared value, ignoring poisoning.
pub fn lock<T: ?Sized>(handle: &Mutex<T>) -> MutexGuard<'_, T> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
