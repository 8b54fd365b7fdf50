//! Construction event reporting.
//!
//! Guards report the few interesting things that happen to them (an instance was
//! built, a constructor failed or panicked, a waiter was handed somebody else's
//! failure) through this module rather than calling a logging framework directly.
//!
//! # Platform Behavior
//!
//! - **`logwise` feature enabled** (the default): events are emitted as logwise
//!   records. Type names and errors are wrapped in [`logwise::privacy::LogIt`]
//!   through [`Plain`], so they appear as their `Display` text.
//! - **`logwise` feature disabled**: every function here is a no-op.
//!
//! Nothing here runs on the fast path. Events are only produced inside the
//! construction critical section, which executes a handful of times per process.

use std::any::type_name;
use std::fmt;

use crate::ConstructionError;

/// Formats its contents with `Display` wherever `Debug` is asked for.
///
/// `LogIt` renders with `Debug`, which would quote type names and dump the
/// whole error enum.
#[cfg_attr(not(feature = "logwise"), allow(dead_code))]
pub(crate) struct Plain<'a>(pub(crate) &'a dyn fmt::Display);

impl fmt::Debug for Plain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.0, f)
    }
}

/// An instance of `T` was built and published.
pub(crate) fn constructed<T>() {
    #[cfg(feature = "logwise")]
    {
        let ty = type_name::<T>();
        logwise::info_sync!(
            "solitary: constructed {ty}",
            ty = logwise::privacy::LogIt(Plain(&ty))
        );
    }
    #[cfg(not(feature = "logwise"))]
    let _ = type_name::<T>;
}

/// The constructor for `T` returned an error or panicked.
pub(crate) fn construction_failed<T>(error: &ConstructionError, failed_attempts: usize) {
    #[cfg(feature = "logwise")]
    logwise::error_sync!(
        "solitary: {e} (failed attempt {n})",
        e = logwise::privacy::LogIt(Plain(error)),
        n = logwise::privacy::LogIt(Plain(&failed_attempts))
    );
    #[cfg(not(feature = "logwise"))]
    let _ = (type_name::<T>, error, failed_attempts);
}

/// A caller blocked behind a failed attempt is being handed that failure.
pub(crate) fn shared_failure<T>(error: &ConstructionError) {
    #[cfg(feature = "logwise")]
    logwise::warn_sync!(
        "solitary: waiter handed the failure it queued behind: {e}",
        e = logwise::privacy::LogIt(Plain(error))
    );
    #[cfg(not(feature = "logwise"))]
    let _ = (type_name::<T>, error);
}

/// A constructor asked its own guard for the instance.
pub(crate) fn reentrant<T>(error: &ConstructionError) {
    #[cfg(feature = "logwise")]
    logwise::error_sync!("solitary: {e}", e = logwise::privacy::LogIt(Plain(error)));
    #[cfg(not(feature = "logwise"))]
    let _ = (type_name::<T>, error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_uses_display_text() {
        let ty = type_name::<String>();
        assert_eq!(format!("{:?}", Plain(&ty)), ty);

        let error = ConstructionError::failed::<u16>("port out of range".into());
        assert_eq!(
            format!("{:?}", Plain(&error)),
            "failed to construct u16: port out of range"
        );
    }
}
