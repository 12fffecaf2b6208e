//! Mutex wrapper - uses parking_lot if available, std otherwise.

#[cfg(feature = "parking_lot")]
pub use parking_lot::Mutex;

#[cfg(not(feature = "parking_lot"))]
mod std_mutex {
    use std::sync::{Mutex as StdMutex, MutexGuard as StdMutexGuard};

    /// Thin wrapper around std::sync::Mutex.
    ///
    /// Hooks may panic under `FatalPolicy::Panic`, so a poisoned lock is
    /// recovered instead of propagated: the guarded lists stay consistent
    /// because every critical section is a single push or clone.
    pub struct Mutex<T>(StdMutex<T>);

    impl<T> Mutex<T> {
        /// Create a new mutex.
        pub const fn new(value: T) -> Self {
            Self(StdMutex::new(value))
        }

        /// Lock the mutex.
        pub fn lock(&self) -> MutexGuard<'_, T> {
            MutexGuard(self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
        }
    }

    /// Guard for std mutex.
    pub struct MutexGuard<'a, T>(StdMutexGuard<'a, T>);

    impl<'a, T> std::ops::Deref for MutexGuard<'a, T> {
        type Target = T;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl<'a, T> std::ops::DerefMut for MutexGuard<'a, T> {
        fn deref_mut(&mut self) -> &mut Self::Target {
            &mut self.0
        }
    }
}

#[cfg(not(feature = "parking_lot"))]
pub use std_mutex::Mutex;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_survives_panicking_holder() {
        let lock = std::sync::Arc::new(Mutex::new(vec![1u32]));
        let cloned = std::sync::Arc::clone(&lock);

        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock();
            panic!("hook panicked while holding the lock");
        })
        .join();

        lock.lock().push(2);
        assert_eq!(*lock.lock(), vec![1, 2]);
    }
}
