/*!
Process-wide lazily constructed singletons for Rust.

solitary guarantees that a shared instance of a type is created at most once,
even when many threads ask for it at the same moment, and that every caller on
every thread gets a reference to that same instance afterwards.

# Overview

A singleton is a type plus a guard. The guard starts uninitialized, becomes
initialized exactly once when the first successful construction publishes the
instance, and stays that way for the rest of the process. Callers never build
the type themselves; they ask the guard, which hands out `&'static T`.

Three guard strategies share one contract (the [`InstanceCell`] trait):

- [`DoubleChecked`]: lazy, and lock-free once built. A single atomic load on the
  common path; the construction mutex is only touched by callers that arrive
  before the instance exists. This is the one to use by default.
- [`Locked`]: lazy, takes the mutex on every access. Simplest to reason about,
  slowest under read-heavy load.
- [`Eager`]: constructed when the guard is constructed, usually at compile time
  through a `const` initializer. Never locks, but always pays for construction.

# Key Features

- **At-most-once construction** under any amount of concurrent first access
- **No partial visibility**: an instance is published with release ordering only
  after it is fully written
- **Fallible constructors**: failures come back as [`ConstructionError`], the
  guard stays uninitialized and the next call retries
- **Shared failures**: callers that were blocked behind a failing attempt receive
  that attempt's error instead of stampeding into their own
- **Constructor panics** are recorded and re-raised without wedging the guard
- **Re-entry detection**: a constructor that asks its own guard for the instance
  gets [`ConstructionError::Reentrant`] rather than a deadlock
- **Test isolation**: owned guards can be reset or drained with `&mut` hooks that
  a shared `static` can never reach

# Quick Start

## Getting an instance

```
use solitary::{Construct, DoubleChecked, Singleton};
use std::convert::Infallible;

pub struct Clock {
    epoch: u64,
}

impl Singleton for Clock {
    type Cell = DoubleChecked<Clock>;
    type Error = Infallible;

    fn cell() -> &'static Self::Cell {
        static CELL: DoubleChecked<Clock> = DoubleChecked::new();
        &CELL
    }

    fn construct(_: Construct<Self>) -> Result<Self, Self::Error> {
        Ok(Clock { epoch: 1_700_000_000 })
    }
}

let clock = Clock::instance().unwrap();
assert_eq!(clock.epoch, 1_700_000_000);
assert!(std::ptr::eq(clock, Clock::instance().unwrap()));
```

## Using a guard directly

Every guard is an ordinary value, so tests can build their own instead of
touching process-wide state:

```
use solitary::DoubleChecked;
use std::sync::atomic::{AtomicUsize, Ordering};

let builds = AtomicUsize::new(0);
let cell = DoubleChecked::new();

std::thread::scope(|s| {
    for _ in 0..8 {
        s.spawn(|| {
            cell.get_or_init(|| {
                builds.fetch_add(1, Ordering::SeqCst);
                "only once"
            });
        });
    }
});

assert_eq!(builds.load(Ordering::SeqCst), 1);
assert_eq!(cell.get(), Some(&"only once"));
```

## Handling construction failure

```
use solitary::{ConstructionError, DoubleChecked};

let cell: DoubleChecked<std::net::SocketAddr> = DoubleChecked::new();

let err = cell.get_or_try_init(|| "localhost".parse()).unwrap_err();
assert!(matches!(err, ConstructionError::Failed { .. }));

// nothing was published, so the next call gets another chance
let addr = cell.get_or_try_init(|| "127.0.0.1:1985".parse()).unwrap();
assert_eq!(addr.port(), 1985);
```

# Feature Flags

- `logwise` (default) - report construction, failures and panics through the
  logwise logging framework

# Module Organization

- [`DoubleChecked`], [`Locked`], [`Eager`] - the guard strategies
- [`InstanceCell`] - what the strategies have in common
- [`Singleton`], [`Construct`] - binds a type to its process-wide guard; the
  token keeps `construct` callable only from `instance`
- [`ConstructionError`] - the only error
- [`State`], [`Stats`] - guard observation, serializable with serde
*/
mod cell;
mod double_checked;
mod eager;
mod error;
mod locked;
mod logging;
mod singleton;
mod slot;
mod state;

pub use cell::InstanceCell;
pub use double_checked::DoubleChecked;
pub use eager::Eager;
pub use error::ConstructionError;
pub use locked::Locked;
pub use singleton::{Construct, Singleton};
pub use state::{State, Stats};
