//! The interface shared by the guard strategies.

use std::convert::Infallible;
use std::error::Error;

use crate::{ConstructionError, State, Stats};

/// A guard and storage for one lazily (or eagerly) constructed instance.
///
/// [`DoubleChecked`](crate::DoubleChecked), [`Locked`](crate::Locked) and
/// [`Eager`](crate::Eager) all implement this trait, so code written against it
/// (including [`Singleton`](crate::Singleton)) can switch strategy by changing a
/// single type.
///
/// Every successful call on the same cell returns a reference to the same
/// instance, and a successful construction happens at most once.
///
/// ```
/// use solitary::{DoubleChecked, InstanceCell, Locked};
///
/// fn answer<C: InstanceCell<u64>>(cell: &C) -> u64 {
///     *cell.get_or_init(|| 42)
/// }
///
/// assert_eq!(answer(&DoubleChecked::new()), 42);
/// assert_eq!(answer(&Locked::new()), 42);
/// ```
pub trait InstanceCell<T> {
    /// Returns the instance, running `f` to build it if nothing has been
    /// published yet.
    ///
    /// If `f` fails (or panics), the cell stays uninitialized and the failure is
    /// returned to this caller and to every caller that was blocked waiting for
    /// the attempt. The next call retries.
    ///
    /// Calling this from inside `f` on the same cell returns
    /// [`ConstructionError::Reentrant`]; it never deadlocks.
    fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>;

    /// Returns the instance if it has been published. Never constructs.
    fn get(&self) -> Option<&T>;

    /// A snapshot of the guard for diagnostics.
    fn stats(&self) -> Stats;

    /// Like [`get_or_try_init`](Self::get_or_try_init) for constructors that
    /// cannot fail.
    ///
    /// # Panics
    ///
    /// Panics if `f` panics, if this caller was waiting on another thread
    /// whose constructor panicked, or on re-entry from inside `f`.
    fn get_or_init<F>(&self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        infallible(self.get_or_try_init(|| Ok::<T, Infallible>(f())))
    }

    /// The guard state.
    fn state(&self) -> State {
        self.stats().state
    }

    fn is_initialized(&self) -> bool {
        self.state().is_initialized()
    }
}

/// Unwraps the result of an infallible construction.
///
/// It can only be `Err` after a constructor panic on another thread or a
/// re-entrant call.
pub(crate) fn infallible<T>(result: Result<&T, ConstructionError>) -> &T {
    match result {
        Ok(value) => value,
        Err(error) => panic!("{error}"),
    }
}
