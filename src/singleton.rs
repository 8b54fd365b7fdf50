//! Binding a type to its one process-wide instance.

use std::error::Error;
use std::fmt;
use std::marker::PhantomData;

use crate::{ConstructionError, InstanceCell};

/// Permission to build one `T`, handed to [`Singleton::construct`].
///
/// Only [`Singleton::instance`] can create one, so nothing outside the guard can
/// call `construct` and end up with a second instance. The token is tied to `T`:
/// the token another singleton receives cannot be passed on to this one.
///
/// ```compile_fail
/// use solitary::{Construct, DoubleChecked, Singleton};
/// use std::convert::Infallible;
///
/// pub struct Pool;
///
/// impl Singleton for Pool {
///     type Cell = DoubleChecked<Pool>;
///     type Error = Infallible;
///
///     fn cell() -> &'static Self::Cell {
///         static CELL: DoubleChecked<Pool> = DoubleChecked::new();
///         &CELL
///     }
///
///     fn construct(_: Construct<Self>) -> Result<Self, Self::Error> {
///         Ok(Pool)
///     }
/// }
///
/// // the field is private, so a token cannot be minted here
/// let rogue = Pool::construct(Construct(std::marker::PhantomData));
/// ```
pub struct Construct<T>(PhantomData<fn() -> T>);

impl<T> fmt::Debug for Construct<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Construct<{}>", std::any::type_name::<T>())
    }
}

/// A type with exactly one live instance per process.
///
/// Implementors pick a guard strategy through [`Cell`](Singleton::Cell), own that
/// guard in a `static` returned by [`cell`](Singleton::cell), and build the
/// instance in [`construct`](Singleton::construct). Callers only ever go through
/// [`instance`](Singleton::instance).
///
/// `construct` takes a [`Construct`] token that only `instance` can create, so
/// the trait itself is no back door. To keep competing instances from being
/// built by other means, give the type private fields (or a private
/// constructor) and implement this trait in the same module.
///
/// ```
/// mod settings {
///     use solitary::{Construct, DoubleChecked, Singleton};
///
///     pub struct Settings {
///         verbose: bool,
///     }
///
///     impl Settings {
///         pub fn verbose(&self) -> bool {
///             self.verbose
///         }
///     }
///
///     impl Singleton for Settings {
///         type Cell = DoubleChecked<Settings>;
///         type Error = std::env::VarError;
///
///         fn cell() -> &'static Self::Cell {
///             static CELL: DoubleChecked<Settings> = DoubleChecked::new();
///             &CELL
///         }
///
///         fn construct(_: Construct<Self>) -> Result<Self, Self::Error> {
///             let verbose = match std::env::var("SETTINGS_DOCTEST_VERBOSE") {
///                 Ok(value) => value == "1",
///                 Err(std::env::VarError::NotPresent) => false,
///                 Err(e) => return Err(e),
///             };
///             Ok(Settings { verbose })
///         }
///     }
/// }
///
/// use solitary::Singleton;
/// use settings::Settings;
///
/// let a = Settings::instance().unwrap();
/// let b = Settings::instance().unwrap();
/// assert!(std::ptr::eq(a, b));
/// assert!(!a.verbose());
/// ```
pub trait Singleton: Sized + Send + Sync + 'static {
    /// The guard strategy: [`DoubleChecked`](crate::DoubleChecked),
    /// [`Locked`](crate::Locked) or [`Eager`](crate::Eager).
    type Cell: InstanceCell<Self> + 'static;

    /// What [`construct`](Singleton::construct) fails with. Use
    /// [`Infallible`](std::convert::Infallible) for constructors that cannot fail.
    type Error: Into<Box<dyn Error + Send + Sync>>;

    /// The process-wide guard for this type.
    fn cell() -> &'static Self::Cell;

    /// Builds the instance.
    ///
    /// Callable only with a [`Construct`] token, which only
    /// [`instance`](Singleton::instance) hands out.
    fn construct(token: Construct<Self>) -> Result<Self, Self::Error>;

    /// Returns the shared instance, constructing it on first use.
    ///
    /// A failed construction is returned as [`ConstructionError`] and leaves the
    /// guard uninitialized, so a later call retries.
    ///
    /// # Re-entry
    ///
    /// If `construct` calls `instance` on its own type, the inner call returns
    /// [`ConstructionError::Reentrant`] instead of deadlocking on the guard.
    fn instance() -> Result<&'static Self, ConstructionError> {
        Self::cell().get_or_try_init(|| Self::construct(Construct(PhantomData)))
    }

    /// Returns the instance only if some earlier call already built it.
    fn try_existing() -> Option<&'static Self> {
        Self::cell().get()
    }
}
