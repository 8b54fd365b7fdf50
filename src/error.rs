//! The error reported when a singleton cannot be constructed.

use std::any::type_name;
use std::error::Error;
use std::sync::Arc;

/// Construction of a singleton instance did not complete.
///
/// The guard is left uninitialized whenever this error is produced, so a later
/// call may retry construction.
///
/// The error is `Clone` because one failed attempt is reported to every caller
/// that was blocked waiting on it, not only to the caller that ran the
/// constructor.
///
/// ```
/// use solitary::{ConstructionError, DoubleChecked};
///
/// let cell: DoubleChecked<u32> = DoubleChecked::new();
/// let err = cell
///     .get_or_try_init(|| "not a number".parse::<u32>())
///     .unwrap_err();
/// assert!(matches!(err, ConstructionError::Failed { .. }));
/// assert_eq!(err.type_name(), "u32");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConstructionError {
    /// The constructor returned an error.
    #[error("failed to construct {type_name}: {source}")]
    Failed {
        type_name: &'static str,
        source: Arc<dyn Error + Send + Sync>,
    },
    /// The constructor panicked.
    ///
    /// The thread that ran the constructor sees the original panic; this variant
    /// is what the callers waiting behind it receive.
    #[error("constructor for {type_name} panicked")]
    Panicked { type_name: &'static str },
    /// The constructor asked its own guard for the instance.
    ///
    /// Answered immediately instead of blocking on the construction mutex the
    /// same thread already holds. Not counted as a failed attempt.
    #[error("constructor for {type_name} re-entered its own guard")]
    Reentrant { type_name: &'static str },
}

impl ConstructionError {
    pub(crate) fn failed<T>(source: Box<dyn Error + Send + Sync>) -> Self {
        ConstructionError::Failed {
            type_name: type_name::<T>(),
            source: Arc::from(source),
        }
    }

    pub(crate) fn panicked<T>() -> Self {
        ConstructionError::Panicked {
            type_name: type_name::<T>(),
        }
    }

    pub(crate) fn reentrant<T>() -> Self {
        ConstructionError::Reentrant {
            type_name: type_name::<T>(),
        }
    }

    /// The name of the type whose construction failed.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConstructionError::Failed { type_name, .. } => type_name,
            ConstructionError::Panicked { type_name } => type_name,
            ConstructionError::Reentrant { type_name } => type_name,
        }
    }

    /// Whether the constructor panicked rather than returning an error.
    pub fn is_panic(&self) -> bool {
        matches!(self, ConstructionError::Panicked { .. })
    }
}
