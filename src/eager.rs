//! Eager construction: the instance exists as soon as the guard does.
//!
//! [`Eager<T>`] pays for construction up front and never locks. With a `const`
//! constructor the value is baked into the binary and a `static Eager<T>` is
//! ready before `main` runs. A non-`const` value can be built at startup with
//! [`Eager::try_new`] and handed to whatever owns it.

use std::error::Error;
use std::fmt;

use crate::{ConstructionError, InstanceCell, State, Stats};

/// An instance that was constructed when the guard was.
///
/// ```
/// use solitary::{Eager, InstanceCell};
///
/// struct Limits {
///     max_connections: u32,
/// }
///
/// static LIMITS: Eager<Limits> = Eager::new(Limits { max_connections: 64 });
///
/// assert_eq!(LIMITS.get().max_connections, 64);
/// // there is nothing left to construct; the closure is never called
/// let limits = LIMITS.get_or_init(|| unreachable!());
/// assert!(std::ptr::eq(limits, LIMITS.get()));
/// ```
pub struct Eager<T> {
    value: T,
}

impl<T> Eager<T> {
    /// Wraps an already built value. Usable in a `static` with a `const` value.
    pub const fn new(value: T) -> Self {
        Eager { value }
    }

    /// Runs a fallible constructor immediately.
    ///
    /// ```
    /// use solitary::Eager;
    ///
    /// let port = Eager::try_new(|| "8080".parse::<u16>()).unwrap();
    /// assert_eq!(*port.get(), 8080);
    /// assert!(Eager::try_new(|| "http".parse::<u16>()).is_err());
    /// ```
    pub fn try_new<F, E>(f: F) -> Result<Self, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match f() {
            Ok(value) => {
                crate::logging::constructed::<T>();
                Ok(Eager::new(value))
            }
            Err(error) => {
                let error = ConstructionError::failed::<T>(error.into());
                crate::logging::construction_failed::<T>(&error, 1);
                Err(error)
            }
        }
    }

    /// The instance. Never fails, never locks.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Unwraps an owned guard.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Default> Default for Eager<T> {
    fn default() -> Self {
        Eager::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Eager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Eager").field(&self.value).finish()
    }
}

impl<T> InstanceCell<T> for Eager<T> {
    /// Always returns the existing instance; `f` is dropped uncalled.
    fn get_or_try_init<F, E>(&self, _f: F) -> Result<&T, ConstructionError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Ok(&self.value)
    }

    fn get(&self) -> Option<&T> {
        Some(&self.value)
    }

    fn stats(&self) -> Stats {
        Stats {
            state: State::Initialized,
            failed_attempts: 0,
            waiting: 0,
        }
    }
}
