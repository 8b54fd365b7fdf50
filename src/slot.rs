/*!
Write-once storage shared by the lazy guard strategies.

`Slot<T>` holds the instance, the atomic guard word, and the construction mutex.
[`DoubleChecked`](crate::DoubleChecked) and [`Locked`](crate::Locked) differ only
in whether they consult the guard word before taking the mutex.

# Internal States

The guard word uses two values:
- `SLOT_UNINITIALIZED` (0): no instance has been published
- `SLOT_INITIALIZED` (1): the instance is fully written and will never change

The word is only ever stored while the construction mutex is held, and only with
`Release` ordering after the value has been written. Readers load it with
`Acquire`, so observing `SLOT_INITIALIZED` implies observing the complete value.

# Failure Bookkeeping

The mutex guards the most recent construction failure. A counter of failed
attempts lives beside it. A caller snapshots the counter before blocking on the
mutex; if the counter moved by the time the mutex is acquired, an attempt failed
while the caller was waiting, and the caller returns that failure instead of
running its own constructor. Callers arriving afterwards start from the new
count and retry.

# Re-entry

A constructor that asks its own slot for the instance would block forever on the
construction mutex it already holds. Each thread keeps the addresses of the
slots whose constructor it is running; a lookup from inside that constructor is
answered without touching the mutex (`None` for reads, `Reentrant` for
construction).
*/

use std::cell::{RefCell, UnsafeCell};
use std::error::Error;
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::logging;
use crate::{ConstructionError, State, Stats};

const SLOT_UNINITIALIZED: u8 = 0;
const SLOT_INITIALIZED: u8 = 1;

thread_local! {
    /// Slots whose constructor is running on this thread, innermost last.
    static CONSTRUCTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

pub(crate) struct Slot<T> {
    /// SLOT_* constants
    state: AtomicU8,
    /// Bumped under `lock` whenever a constructor fails or panics.
    failures: AtomicUsize,
    /// Callers blocked on `lock` right now.
    waiting: AtomicUsize,
    /// Most recent failure, handed to callers that were waiting on it.
    lock: Mutex<Option<ConstructionError>>,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) const fn new() -> Self {
        Slot {
            state: AtomicU8::new(SLOT_UNINITIALIZED),
            failures: AtomicUsize::new(0),
            waiting: AtomicUsize::new(0),
            lock: Mutex::new(None),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Lock-free read of the published value.
    #[inline]
    pub(crate) fn get(&self) -> Option<&T> {
        match self.state.load(Ordering::Acquire) {
            SLOT_UNINITIALIZED => None,
            SLOT_INITIALIZED => {
                // SAFETY: the Acquire load synchronizes with the Release store made
                // after the value was written, and the value is never written again.
                Some(unsafe { self.value_unchecked() })
            }
            other => panic!("Slot: invalid state {other} on get"),
        }
    }

    /// Reads the published value while holding the construction mutex.
    pub(crate) fn get_locked(&self) -> Option<&T> {
        if self.constructing_here() {
            // our own constructor is still running, so nothing is published
            return None;
        }
        let _held = self.lock();
        self.get()
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures.load(Ordering::Acquire)
    }

    pub(crate) fn stats(&self) -> Stats {
        let state = if self.get().is_some() {
            State::Initialized
        } else {
            State::Uninitialized
        };
        Stats {
            state,
            failed_attempts: self.failures(),
            waiting: self.waiting.load(Ordering::Acquire),
        }
    }

    /// [`stats`](Self::stats) taken while holding the construction mutex.
    pub(crate) fn stats_locked(&self) -> Stats {
        if self.constructing_here() {
            return self.stats();
        }
        let _held = self.lock();
        self.stats()
    }

    /// The construction critical section.
    ///
    /// `seen` is the failure count the caller observed before it started waiting
    /// for the mutex.
    pub(crate) fn init_locked<F, E>(&self, seen: usize, f: F) -> Result<&T, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        if self.constructing_here() {
            let error = ConstructionError::reentrant::<T>();
            logging::reentrant::<T>(&error);
            return Err(error);
        }

        self.waiting.fetch_add(1, Ordering::AcqRel);
        let mut last_failure = self.lock();
        self.waiting.fetch_sub(1, Ordering::AcqRel);

        // second check: someone may have published while we waited
        if let Some(value) = self.get() {
            return Ok(value);
        }
        if self.failures.load(Ordering::Relaxed) != seen {
            if let Some(error) = last_failure.as_ref() {
                logging::shared_failure::<T>(error);
                return Err(error.clone());
            }
        }

        let addr = self.addr();
        CONSTRUCTING.with(|slots| slots.borrow_mut().push(addr));
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        CONSTRUCTING.with(|slots| slots.borrow_mut().retain(|a| *a != addr));

        match outcome {
            Ok(Ok(value)) => {
                // SAFETY: we hold the mutex and the state is uninitialized, so
                // nobody else writes the value and no reader dereferences it yet.
                unsafe {
                    (*self.value.get()).write(value);
                }
                self.state.store(SLOT_INITIALIZED, Ordering::Release);
                *last_failure = None;
                logging::constructed::<T>();
                // SAFETY: just published by this thread
                Ok(unsafe { self.value_unchecked() })
            }
            Ok(Err(error)) => {
                let error = ConstructionError::failed::<T>(error.into());
                self.record_failure(&mut last_failure, error.clone());
                Err(error)
            }
            Err(payload) => {
                self.record_failure(&mut last_failure, ConstructionError::panicked::<T>());
                drop(last_failure);
                panic::resume_unwind(payload)
            }
        }
    }

    fn record_failure(&self, last_failure: &mut Option<ConstructionError>, error: ConstructionError) {
        let attempts = self.failures.fetch_add(1, Ordering::Release) + 1;
        logging::construction_failed::<T>(&error, attempts);
        *last_failure = Some(error);
    }

    fn addr(&self) -> usize {
        self as *const Self as usize
    }

    fn constructing_here(&self) -> bool {
        let addr = self.addr();
        CONSTRUCTING.with(|slots| slots.borrow().contains(&addr))
    }

    /// Constructor panics are caught before they can poison the mutex, but a
    /// panicking logger could still do it. The guarded data is only the failure
    /// record, which stays consistent either way.
    fn lock(&self) -> MutexGuard<'_, Option<ConstructionError>> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// # Safety
    /// The state must be `SLOT_INITIALIZED`.
    unsafe fn value_unchecked(&self) -> &T {
        // SAFETY: guaranteed by the caller
        unsafe { (*self.value.get()).assume_init_ref() }
    }

    /// Moves the value out and returns the slot to its initial state.
    pub(crate) fn take(&mut self) -> Option<T> {
        let state = self.state.get_mut();
        match *state {
            SLOT_UNINITIALIZED => None,
            SLOT_INITIALIZED => {
                *state = SLOT_UNINITIALIZED;
                // SAFETY: the value was initialized and the state now says it is
                // not, so it cannot be read or dropped a second time.
                Some(unsafe { self.value.get_mut().assume_init_read() })
            }
            other => panic!("Slot: invalid state {other} on take"),
        }
    }

    /// Drops the value and forgets every recorded failure.
    pub(crate) fn reset(&mut self) {
        drop(self.take());
        *self.failures.get_mut() = 0;
        *self.lock.get_mut().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        match *self.state.get_mut() {
            SLOT_UNINITIALIZED => {}
            SLOT_INITIALIZED => {
                // SAFETY: initialized and about to be deallocated
                unsafe { self.value.get_mut().assume_init_drop() }
            }
            other => panic!("Slot: invalid state {other} on drop"),
        }
    }
}

impl<T> std::fmt::Debug for Slot<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("value", &self.get())
            .field("failed_attempts", &self.failures())
            .finish()
    }
}

// SAFETY: a shared Slot hands out &T to many threads (needs T: Sync), and the
// thread that constructs T may differ from the one that drops it (needs T: Send).
// Writes to `value` happen once, under the mutex, before the Release store that
// readers Acquire.
unsafe impl<T: Send + Sync> Sync for Slot<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn empty_until_initialized() {
        let slot = Slot::<u32>::new();
        assert_eq!(slot.get(), None);
        assert_eq!(slot.stats().state, State::Uninitialized);
        let value = slot.init_locked(0, || Ok::<_, io::Error>(5)).unwrap();
        assert_eq!(*value, 5);
        assert_eq!(slot.get(), Some(&5));
        assert_eq!(slot.stats().state, State::Initialized);
    }

    #[test]
    fn second_check_skips_constructor() {
        let slot = Slot::<u32>::new();
        slot.init_locked(0, || Ok::<_, io::Error>(1)).unwrap();
        let value = slot
            .init_locked(0, || -> Result<u32, io::Error> { panic!("constructor ran twice") })
            .unwrap();
        assert_eq!(*value, 1);
    }

    #[test]
    fn waiter_shares_failure_fresh_caller_retries() {
        let slot = Slot::<u32>::new();
        // a waiter snapshots the counter before the failing attempt completes
        let seen = slot.failures();
        let err = slot
            .init_locked(seen, || Err::<u32, _>(io::Error::other("first")))
            .unwrap_err();
        assert_eq!(slot.failures(), 1);

        let shared = slot
            .init_locked(seen, || -> Result<u32, io::Error> { panic!("waiter must not construct") })
            .unwrap_err();
        assert_eq!(shared.to_string(), err.to_string());
        assert_eq!(slot.failures(), 1);

        let value = slot
            .init_locked(slot.failures(), || Ok::<_, io::Error>(9))
            .unwrap();
        assert_eq!(*value, 9);
    }

    #[test]
    fn panic_is_recorded_and_rethrown() {
        let slot = Slot::<u32>::new();
        let seen = slot.failures();
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = slot.init_locked(seen, || -> Result<u32, io::Error> { panic!("boom") });
        }));
        assert!(caught.is_err());
        assert_eq!(slot.failures(), 1);
        assert_eq!(slot.get(), None);

        let shared = slot
            .init_locked(seen, || Ok::<_, io::Error>(1))
            .unwrap_err();
        assert!(shared.is_panic());

        assert_eq!(
            *slot.init_locked(slot.failures(), || Ok::<_, io::Error>(2)).unwrap(),
            2
        );
    }

    #[test]
    fn reentry_is_refused_instead_of_blocking() {
        let slot = Slot::<u32>::new();
        let value = slot
            .init_locked(0, || {
                assert_eq!(slot.get_locked(), None);
                assert_eq!(slot.stats_locked().state, State::Uninitialized);
                let nested = slot.init_locked(0, || Ok::<_, io::Error>(1));
                assert!(matches!(nested, Err(ConstructionError::Reentrant { .. })));
                Ok::<_, io::Error>(2)
            })
            .unwrap();
        assert_eq!(*value, 2);
        assert_eq!(slot.failures(), 0);
        // the thread no longer counts as constructing once the attempt is over
        assert_eq!(slot.get_locked(), Some(&2));
    }

    struct Tracked<'a>(&'a AtomicUsize);

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn drop_runs_once_for_initialized_value() {
        let drops = AtomicUsize::new(0);
        {
            let slot = Slot::new();
            slot.init_locked(0, || Ok::<_, io::Error>(Tracked(&drops))).unwrap();
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        {
            let _slot: Slot<Tracked<'_>> = Slot::new();
        }
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn take_and_reset() {
        let mut slot = Slot::<String>::new();
        let _ = slot.init_locked(0, || Err::<String, _>(io::Error::other("nope")));
        slot.init_locked(slot.failures(), || Ok::<_, io::Error>("hello".to_string()))
            .unwrap();
        assert_eq!(slot.take().as_deref(), Some("hello"));
        assert_eq!(slot.get(), None);
        assert_eq!(slot.failures(), 1);

        slot.reset();
        assert_eq!(
            slot.stats(),
            Stats {
                state: State::Uninitialized,
                failed_attempts: 0,
                waiting: 0,
            }
        );
    }
}
