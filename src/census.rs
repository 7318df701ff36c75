//! Reporting over several counted types at once.
//!
//! The counters of each type have their own width and live behind their own
//! lock. [`TypeCensus`] reads one type's counters in a single critical
//! section and widens them to `u64`, so types of different widths can be
//! listed side by side. Consistency is decided before widening, in the
//! type's own width. [`Census`] is a list of types to read together.
//!
//! No ordering is promised across types: each entry is consistent on its
//! own, but two entries may be read at slightly different instants.
//!
//! # Examples
//!
//! ```rust
//! use istanze::census::Census;
//! use istanze::counted::Counted;
//! use istanze::countable;
//!
//! struct Request { _counted: Counted<Request> }
//! struct Session { _counted: Counted<Session> }
//!
//! countable!(Request);
//! countable!(Session, u32, extended);
//!
//! let census = Census::new().track::<Request>().track_extended::<Session>();
//!
//! let _r = Request { _counted: Counted::new()? };
//! let entries = census.collect();
//! assert_eq!(entries[0].status.alive, 1);
//! assert!(entries[1].transfers.is_some());
//! assert!(census.inconsistent().is_empty());
//! # Ok::<(), istanze::error::CounterError>(())
//! ```

use std::any::type_name;
use std::fmt::{self, Debug, Display};

use tracing::{info, warn};

use crate::counters::{Countable, CounterStatus, TransferCountable, TransferStatus};

/// The counters of one type, widened to `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCensus {
    /// Name of the counted type.
    pub type_name: &'static str,
    /// Primary counters.
    pub status: CounterStatus<u64>,
    /// Copy and move counters, for types exposing them.
    pub transfers: Option<TransferStatus<u64>>,
    /// [`CounterStatus::is_consistent`] of the native-width counters.
    pub consistent: bool,
}

impl TypeCensus {
    /// Reads the primary counters of `T`.
    pub fn of<T: Countable>() -> Self {
        let state = T::counter_state();
        let status = state.snapshot();
        TypeCensus {
            type_name: display_name::<T>(state.name()),
            status: status.widen(),
            transfers: None,
            consistent: status.is_consistent(),
        }
    }

    /// Reads the primary and copy/move counters of `T` in one critical
    /// section.
    pub fn of_extended<T: TransferCountable>() -> Self {
        let state = T::counter_state();
        let (status, transfers) = state.full_snapshot();
        TypeCensus {
            type_name: display_name::<T>(state.name()),
            status: status.widen(),
            transfers: Some(transfers.widen()),
            consistent: status.is_consistent(),
        }
    }

    /// Returns `true` if the flag is clear and `created == alive + destroyed`
    /// modulo the width of the counted type.
    pub fn is_consistent(&self) -> bool {
        self.consistent
    }
}

impl Display for TypeCensus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.status)?;
        if let Some(transfers) = &self.transfers {
            write!(f, " {}", transfers)?;
        }
        Ok(())
    }
}

fn display_name<T>(state_name: &'static str) -> &'static str {
    if state_name.is_empty() {
        type_name::<T>()
    } else {
        state_name
    }
}

/// A list of counted types read together.
#[derive(Clone, Default)]
pub struct Census {
    probes: Vec<fn() -> TypeCensus>,
}

impl Census {
    /// Creates an empty census.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T`, reporting its primary counters.
    pub fn track<T: Countable>(mut self) -> Self {
        self.probes.push(TypeCensus::of::<T>);
        self
    }

    /// Adds `T`, reporting its primary and copy/move counters.
    pub fn track_extended<T: TransferCountable>(mut self) -> Self {
        self.probes.push(TypeCensus::of_extended::<T>);
        self
    }

    /// Number of tracked types.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Returns `true` if no type is tracked.
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Reads every tracked type, in tracking order.
    pub fn collect(&self) -> Vec<TypeCensus> {
        self.probes.iter().map(|probe| probe()).collect()
    }

    /// Returns the tracked types whose counters are inconsistent or whose
    /// `too_many_destructions` flag is set.
    pub fn inconsistent(&self) -> Vec<TypeCensus> {
        self.collect()
            .into_iter()
            .filter(|entry| !entry.is_consistent())
            .collect()
    }

    /// Logs one event per tracked type: `info` when consistent, `warn`
    /// otherwise. Returns the entries that were logged.
    pub fn report(&self) -> Vec<TypeCensus> {
        let entries = self.collect();
        for entry in &entries {
            let status = &entry.status;
            if entry.is_consistent() {
                info!(
                    counted_type = entry.type_name,
                    created = status.created,
                    alive = status.alive,
                    destroyed = status.destroyed,
                    "object census"
                );
            } else {
                warn!(
                    counted_type = entry.type_name,
                    created = status.created,
                    alive = status.alive,
                    destroyed = status.destroyed,
                    too_many_destructions = status.too_many_destructions,
                    "object census inconsistent"
                );
            }
        }
        entries
    }
}

impl Debug for Census {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.collect()).finish()
    }
}
