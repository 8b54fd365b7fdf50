/*!
Double-checked lazy initialization.

[`DoubleChecked<T>`] builds its instance on first access and never takes a lock
once the instance exists.

# Algorithm

1. Load the guard word (`Acquire`). If it says initialized, return the value.
   This is the whole fast path: one atomic load, no lock, no write.
2. Otherwise take the construction mutex.
3. Check the guard again under the mutex. Several threads may have missed the
   fast path at the same moment; only the first one through the mutex builds.
4. Still uninitialized: run the constructor, write the value, then store the
   guard word with `Release`. Readers that see "initialized" see the whole value.
5. Release the mutex and return.

A failing constructor leaves the guard uninitialized. The failure goes to the
caller that ran the constructor and to every caller already queued on the mutex
behind it; later callers retry.

# Examples

```
use solitary::DoubleChecked;
use std::thread;

static GREETING: DoubleChecked<String> = DoubleChecked::new();

let handles: Vec<_> = (0..4)
    .map(|_| thread::spawn(|| GREETING.get_or_init(|| "hello".to_string()) as *const String as usize))
    .collect();
let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

// every thread saw the same instance
assert!(addresses.windows(2).all(|w| w[0] == w[1]));
assert_eq!(GREETING.get().map(String::as_str), Some("hello"));
```

## Failed Initialization Recovery

```
use solitary::{ConstructionError, DoubleChecked};

let cell: DoubleChecked<u16> = DoubleChecked::new();

let first = cell.get_or_try_init(|| "70000".parse::<u16>());
assert!(matches!(first, Err(ConstructionError::Failed { .. })));
assert!(!cell.is_initialized());

// the guard is back to uninitialized, so a later call can try again
let second = cell.get_or_try_init(|| "443".parse::<u16>());
assert_eq!(second.unwrap(), &443);
assert_eq!(cell.stats().failed_attempts, 1);
```
*/

use std::error::Error;
use std::fmt;

use crate::cell::{InstanceCell, infallible};
use crate::slot::Slot;
use crate::{ConstructionError, State, Stats};

/// A lazily constructed instance guarded by double-checked locking.
///
/// Usually stored in a `static` and reached through
/// [`Singleton::instance`](crate::Singleton::instance). Because `new` is `const`,
/// no other runtime setup is required.
pub struct DoubleChecked<T> {
    slot: Slot<T>,
}

impl<T> DoubleChecked<T> {
    /// Creates an uninitialized cell.
    ///
    /// ```
    /// use solitary::DoubleChecked;
    ///
    /// static GLOBAL: DoubleChecked<Vec<u8>> = DoubleChecked::new();
    /// let local = DoubleChecked::<String>::new();
    /// assert!(GLOBAL.get().is_none() && local.get().is_none());
    /// ```
    pub const fn new() -> Self {
        DoubleChecked { slot: Slot::new() }
    }

    /// Returns the instance, constructing it with `f` on first access.
    ///
    /// See [`InstanceCell::get_or_try_init`] for the failure rules.
    ///
    /// # Re-entry
    ///
    /// If `f` asks this same cell for the instance, the inner call returns
    /// [`ConstructionError::Reentrant`] instead of deadlocking. The outer
    /// construction carries on unaffected.
    #[inline]
    pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        if let Some(value) = self.slot.get() {
            return Ok(value);
        }
        self.init_slow(f)
    }

    #[cold]
    fn init_slow<F, E>(&self, f: F) -> Result<&T, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let seen = self.slot.failures();
        self.slot.init_locked(seen, f)
    }

    /// Returns the instance, constructing it with the infallible `f` on first access.
    ///
    /// # Panics
    ///
    /// If `f` panics, if another thread's constructor panicked while this
    /// caller was waiting for it, or if called re-entrantly from inside `f`.
    #[inline]
    pub fn get_or_init<F>(&self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        infallible(self.get_or_try_init(|| Ok::<T, std::convert::Infallible>(f())))
    }

    /// Returns the instance if it has been published. Never blocks.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    /// Whether the instance has been published. Never blocks.
    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The guard state. Never blocks.
    pub fn state(&self) -> State {
        self.slot.stats().state
    }

    /// A lock-free snapshot of the guard.
    pub fn stats(&self) -> Stats {
        self.slot.stats()
    }

    /// Moves the instance out, leaving the cell uninitialized.
    ///
    /// Needs `&mut self`, so it cannot be used on a shared `static`; it exists for
    /// owned cells in test harnesses.
    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    /// Drops the instance and clears the failure count.
    ///
    /// ```
    /// use solitary::DoubleChecked;
    ///
    /// let mut cell = DoubleChecked::new();
    /// cell.get_or_init(|| 1);
    /// cell.reset();
    /// assert_eq!(*cell.get_or_init(|| 2), 2);
    /// ```
    pub fn reset(&mut self) {
        self.slot.reset()
    }
}

impl<T> Default for DoubleChecked<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for DoubleChecked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DoubleChecked").field(&self.slot).finish()
    }
}

impl<T> InstanceCell<T> for DoubleChecked<T> {
    fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        DoubleChecked::get_or_try_init(self, f)
    }

    fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    fn stats(&self) -> Stats {
        self.slot.stats()
    }
}
