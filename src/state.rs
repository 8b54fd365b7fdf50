//! Observable state of an initialization guard.

use serde::{Deserialize, Serialize};

/// Whether a guard holds its instance yet.
///
/// The only transition is `Uninitialized` to `Initialized`. Shared guards never
/// go back; owned cells can be returned to `Uninitialized` with their `reset`
/// and `take` hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Uninitialized,
    Initialized,
}

impl State {
    /// `true` for [`State::Initialized`].
    pub fn is_initialized(self) -> bool {
        self == State::Initialized
    }
}

/// A snapshot of a guard, suitable for diagnostics output.
///
/// ```
/// use solitary::{DoubleChecked, State, Stats};
///
/// let cell = DoubleChecked::new();
/// cell.get_or_init(|| 7u8);
/// assert_eq!(
///     cell.stats(),
///     Stats { state: State::Initialized, failed_attempts: 0, waiting: 0 }
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Whether the instance has been published.
    pub state: State,
    /// Constructor calls that returned an error or panicked.
    pub failed_attempts: usize,
    /// Callers currently blocked on the construction mutex.
    ///
    /// Only callers that found the guard uninitialized are counted. Always zero
    /// for [`Eager`](crate::Eager).
    pub waiting: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_json_shape() {
        let stats = Stats {
            state: State::Uninitialized,
            failed_attempts: 2,
            waiting: 1,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "uninitialized", "failed_attempts": 2, "waiting": 1})
        );
        let back: Stats = serde_json::from_value(json).unwrap();
        assert_eq!(back, stats);
    }

    #[test]
    fn initialized_flag() {
        assert!(State::Initialized.is_initialized());
        assert!(!State::Uninitialized.is_initialized());
    }
}
