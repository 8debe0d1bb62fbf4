//! Bus lock shared between the sampling tick and the configuration path.
//!
//! The lock owns everything a bus transaction touches, so holding the guard is the
//! only way to reach the transport. The sampling side uses [`BusLock::try_acquire`]
//! and never waits; the configuration side waits a bounded time with
//! [`BusLock::acquire_within`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embedded_hal::delay::DelayNs;

/// Interval between acquisition attempts while waiting for the lock.
pub const POLL_INTERVAL_US: u32 = 50;

/// Guard returned by a successful acquisition; releases the lock on drop.
pub type BusGuard<'a, T> = MutexGuard<'a, CriticalSectionRawMutex, T>;

/// Binary lock around the bus state.
pub struct BusLock<T> {
    inner: Mutex<CriticalSectionRawMutex, T>,
}

impl<T> BusLock<T> {
    /// Wraps `value` in an unlocked lock.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquires the lock if it is free, without waiting.
    pub fn try_acquire(&self) -> Option<BusGuard<'_, T>> {
        self.inner.try_lock().ok()
    }

    /// Acquires the lock, polling for at most `budget_us` microseconds.
    pub fn acquire_within(
        &self,
        delay: &mut impl DelayNs,
        budget_us: u32,
    ) -> Option<BusGuard<'_, T>> {
        let mut waited = 0u32;
        loop {
            if let Some(guard) = self.try_acquire() {
                return Some(guard);
            }
            if waited >= budget_us {
                return None;
            }
            delay.delay_us(POLL_INTERVAL_US);
            waited = waited.saturating_add(POLL_INTERVAL_US);
        }
    }

    /// Exclusive access without locking, available while nothing else can hold a reference.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    /// Consumes the lock and returns the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::BusLock;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    #[test]
    fn try_acquire_fails_while_held() {
        let lock = BusLock::new(0u8);
        let guard = lock.try_acquire().expect("lock free");
        assert!(lock.try_acquire().is_none());
        drop(guard);
        assert!(lock.try_acquire().is_some());
    }

    #[test]
    fn bounded_wait_gives_up() {
        let lock = BusLock::new(0u8);
        let _held = lock.try_acquire().expect("lock free");
        let mut delay = NoopDelay::new();
        assert!(lock.acquire_within(&mut delay, 1_000).is_none());
    }

    #[test]
    fn guard_gives_mutable_access() {
        let lock = BusLock::new(1u8);
        {
            let mut guard = lock.try_acquire().expect("lock free");
            *guard += 1;
        }
        let mut delay = NoopDelay::new();
        assert_eq!(*lock.acquire_within(&mut delay, 0).expect("lock free"), 2);
    }
}
