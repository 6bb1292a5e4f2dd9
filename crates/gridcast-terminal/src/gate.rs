//! Non-blocking exclusion between the draw and present paths.
//!
//! A [`SpinGate`] never parks the calling thread on an OS lock queue. It
//! retries `try_lock` with a short spin, then yields the time slice until
//! the holder lets go. Holders only keep the gate for one grid pass or one
//! terminal write, so waits stay short.

use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;

/// Spins before falling back to `yield_now`.
const SPIN_LIMIT: u32 = 64;

/// Value guarded by try-lock with spin/yield backoff.
#[derive(Debug, Default)]
pub struct SpinGate<T> {
    inner: Mutex<T>,
}

impl<T> SpinGate<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Take the gate if it is free right now.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_, T>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Take the gate, spinning and then yielding while it is held.
    pub fn acquire(&self) -> MutexGuard<'_, T> {
        let mut attempts = 0u32;
        loop {
            if let Some(guard) = self.try_acquire() {
                return guard;
            }
            if attempts < SPIN_LIMIT {
                std::hint::spin_loop();
                attempts += 1;
            } else {
                thread::yield_now();
            }
        }
    }

    /// Consume the gate and return the value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_try_acquire_when_free() {
        let gate = SpinGate::new(5);
        assert_eq!(*gate.try_acquire().unwrap(), 5);
    }

    #[test]
    fn test_try_acquire_when_held() {
        let gate = SpinGate::new(());
        let _held = gate.acquire();
        assert!(gate.try_acquire().is_none());
    }

    #[test]
    fn test_acquire_across_threads() {
        let gate = Arc::new(SpinGate::new(0u64));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *gate.acquire() += 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*gate.acquire(), 4000);
    }

    #[test]
    fn test_poisoned_gate_still_opens() {
        let gate = Arc::new(SpinGate::new(1));
        let poisoner = Arc::clone(&gate);
        let _ = thread::spawn(move || {
            let _guard = poisoner.acquire();
            panic!("poison");
        })
        .join();
        assert_eq!(*gate.acquire(), 1);
    }

    #[test]
    fn test_into_inner() {
        let gate = SpinGate::new(String::from("x"));
        gate.acquire().push('y');
        assert_eq!(gate.into_inner(), "xy");
    }
}
