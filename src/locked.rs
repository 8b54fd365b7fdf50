//! Lazy initialization that takes the construction mutex on every access.
//!
//! [`Locked<T>`] honours the same contract as [`DoubleChecked`](crate::DoubleChecked)
//! but skips the lock-free first check: every call, including [`Locked::get`],
//! acquires the mutex, inspects the guard, constructs if needed and releases.
//! Callers keep serializing on the mutex after construction, so this only suits
//! instances that are rarely accessed.

use std::error::Error;
use std::fmt;

use crate::cell::{InstanceCell, infallible};
use crate::slot::Slot;
use crate::{ConstructionError, State, Stats};

/// A lazily constructed instance guarded by a mutex on every access.
///
/// ```
/// use solitary::Locked;
///
/// static COUNTER_NAME: Locked<String> = Locked::new();
///
/// let a = COUNTER_NAME.get_or_init(|| "requests".to_string());
/// let b = COUNTER_NAME.get_or_init(|| unreachable!());
/// assert!(std::ptr::eq(a, b));
/// ```
pub struct Locked<T> {
    slot: Slot<T>,
}

impl<T> Locked<T> {
    /// An uninitialized guard. Usable in a `static`.
    pub const fn new() -> Self {
        Locked { slot: Slot::new() }
    }

    /// Returns the instance, constructing it with `f` if needed. Always locks.
    ///
    /// # Re-entry
    ///
    /// Called from inside `f` on the same guard, this returns
    /// [`ConstructionError::Reentrant`] rather than waiting on the mutex the
    /// outer call holds.
    pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        // Reading the counter before the mutex lets this caller share a failure
        // that completes while it waits, exactly as the double-checked path does.
        let seen = self.slot.failures();
        self.slot.init_locked(seen, f)
    }

    /// Like [`get_or_try_init`](Self::get_or_try_init) for constructors that
    /// cannot fail.
    ///
    /// # Panics
    ///
    /// If `f` panics, or if this caller was waiting on an attempt that panicked
    /// or on a re-entrant call.
    pub fn get_or_init<F>(&self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        infallible(self.get_or_try_init(|| Ok::<T, std::convert::Infallible>(f())))
    }

    /// Returns the instance if it has been published. Locks.
    pub fn get(&self) -> Option<&T> {
        self.slot.get_locked()
    }

    /// Whether the instance has been published. Locks.
    pub fn is_initialized(&self) -> bool {
        self.get().is_some()
    }

    /// The guard state. Locks.
    pub fn state(&self) -> State {
        self.stats().state
    }

    /// A snapshot of the guard, read under the mutex like every other access.
    pub fn stats(&self) -> Stats {
        self.slot.stats_locked()
    }

    /// Moves the instance out, leaving the guard uninitialized.
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    /// Drops the instance and clears the failure count.
    pub fn reset(&mut self) {
        self.slot.reset()
    }
}

impl<T> Default for Locked<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Locked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Locked").field(&self.slot).finish()
    }
}

impl<T> InstanceCell<T> for Locked<T> {
    fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Locked::get_or_try_init(self, f)
    }

    fn get(&self) -> Option<&T> {
        Locked::get(self)
    }

    fn stats(&self) -> Stats {
        Locked::stats(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn concurrent_first_access_builds_once() {
        const THREADS: usize = 64;
        let built = AtomicUsize::new(0);
        let cell = Locked::new();
        let barrier = Barrier::new(THREADS);
        let (cell, built, barrier) = (&cell, &built, &barrier);
        let seen: Vec<&u64> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(move || {
                        barrier.wait();
                        cell.get_or_init(|| {
                            built.fetch_add(1, Ordering::SeqCst);
                            0xfeed
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(seen.iter().all(|v| std::ptr::eq(*v, seen[0])));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retry_after_failure() {
        let mut cell = Locked::new();
        assert!(
            cell.get_or_try_init(|| Err::<&str, _>(io::Error::other("later")))
                .is_err()
        );
        assert_eq!(cell.get(), None);
        assert_eq!(cell.get_or_try_init(|| Ok::<_, io::Error>("now")).unwrap(), &"now");
        assert_eq!(cell.stats().failed_attempts, 1);

        cell.reset();
        assert_eq!(cell.state(), State::Uninitialized);
        assert_eq!(cell.stats().failed_attempts, 0);
    }

    #[test]
    fn observers_inside_constructor_do_not_block() {
        let cell: Locked<u32> = Locked::new();
        let value = cell.get_or_init(|| {
            assert_eq!(cell.get(), None);
            assert!(!cell.is_initialized());
            assert_eq!(cell.state(), State::Uninitialized);
            assert_eq!(cell.stats().failed_attempts, 0);
            let nested = cell.get_or_try_init(|| Ok::<_, io::Error>(1));
            assert!(matches!(nested, Err(ConstructionError::Reentrant { .. })));
            9
        });
        assert_eq!(*value, 9);
        assert_eq!(cell.stats().failed_attempts, 0);
    }

    #[test]
    fn stats_report_queued_callers() {
        let cell: Locked<u8> = Locked::new();
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let cell = &cell;
        thread::scope(|s| {
            s.spawn(move || {
                cell.get_or_init(|| {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    1
                })
            });
            started_rx.recv().unwrap();
            let waiter = s.spawn(move || *cell.get_or_init(|| 2));
            while cell.slot.stats().waiting == 0 {
                thread::sleep(std::time::Duration::from_millis(1));
            }
            release_tx.send(()).unwrap();
            assert_eq!(waiter.join().unwrap(), 1);
        });
        assert_eq!(cell.stats().waiting, 0);
    }
}
