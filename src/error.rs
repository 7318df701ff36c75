//! Error type for counted constructions.
//!
//! Only construction can fail. Destruction never reports an error: a
//! destruction that cannot be matched against a live instance is recorded in
//! the sticky `too_many_destructions` flag of the type's
//! [`CounterState`](crate::counters::state::CounterState) instead.

use thiserror::Error;

/// Errors raised while constructing a counted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CounterError {
    /// Incrementing `created` or `alive` wrapped the counter to zero.
    ///
    /// The counters are left in their wrapped state; nothing is rolled back.
    #[error("object counters of `{type_name}` in overflow")]
    Overflow {
        /// Name of the counted type whose counters wrapped.
        type_name: &'static str,
    },
}

/// Result type for counted constructions.
pub type Result<T> = std::result::Result<T, CounterError>;
