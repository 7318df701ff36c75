//! The per-type lifecycle counter record.
//!
//! [`CounterState`] holds the created/alive/destroyed counters, the sticky
//! `too_many_destructions` flag and the four copy/move counters of one counted
//! type, all behind a single lock. Every hook and every snapshot holds the
//! lock for its whole duration, so a reader never observes `created` updated
//! while `alive` is not.
//!
//! The lock is cache-line padded: states of different types are usually
//! adjacent `static`s, and padding keeps their locks from contending on the
//! same line.

use std::fmt::{self, Debug};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use tracing::{error, warn};

use crate::counters::{CounterStatus, CounterWidth, TransferStatus};
use crate::error::{CounterError, Result};

/// Everything guarded by the state lock.
struct Record<C> {
    status: CounterStatus<C>,
    transfers: TransferStatus<C>,
}

impl<C: CounterWidth> Record<C> {
    const fn new() -> Self {
        Record {
            status: CounterStatus::zeroed(),
            transfers: TransferStatus::zeroed(),
        }
    }

    /// Increments `created` and `alive`, returning `true` if either wrapped.
    #[inline]
    fn construct(&mut self) -> bool {
        let status = &mut self.status;
        status.created = status.created.wrapping_add(&C::one());
        status.alive = status.alive.wrapping_add(&C::one());
        status.created.is_zero() || status.alive.is_zero()
    }

    /// Records a destruction, returning `true` if it set the flag for the
    /// first time.
    #[inline]
    fn destruct(&mut self) -> bool {
        let status = &mut self.status;
        if status.alive.is_zero() || status.created != status.alive.wrapping_add(&status.destroyed)
        {
            let first = !status.too_many_destructions;
            status.too_many_destructions = true;
            first
        } else {
            status.alive = status.alive - C::one();
            status.destroyed = status.destroyed.wrapping_add(&C::one());
            false
        }
    }
}

/// The counters shared by every instance of one counted type.
///
/// There is one `CounterState` per counted type, living for the whole
/// process. It is never reset: no public operation clears a counter or the
/// `too_many_destructions` flag.
///
/// The hooks (`on_*`) are normally driven by
/// [`Counted`](crate::counted::Counted); they are public so that types with
/// unusual lifecycles can drive them directly.
///
/// # Examples
///
/// ```rust
/// use istanze::counters::state::CounterState;
///
/// static STATE: CounterState<u8> = CounterState::named("Example");
///
/// STATE.on_construct()?;
/// STATE.on_construct()?;
/// STATE.on_destruct();
/// assert_eq!(STATE.snapshot().as_tuple(), (2, 1, 1, false));
/// # Ok::<(), istanze::error::CounterError>(())
/// ```
pub struct CounterState<C: CounterWidth> {
    name: &'static str,
    record: CachePadded<Mutex<Record<C>>>,
}

impl<C: CounterWidth> CounterState<C> {
    /// Creates an unnamed state with every counter at zero.
    pub const fn new() -> Self {
        Self::named("")
    }

    /// Creates a state for the type called `name`, with every counter at zero.
    ///
    /// The name is used in log events and in [`CounterError::Overflow`].
    pub const fn named(name: &'static str) -> Self {
        CounterState {
            name,
            record: CachePadded::new(parking_lot::const_mutex(Record::new())),
        }
    }

    /// Returns the name of the counted type, or an empty string.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `created`, `alive`, `destroyed` and the flag from one critical
    /// section.
    #[inline]
    pub fn snapshot(&self) -> CounterStatus<C> {
        self.record.lock().status
    }

    /// Returns the four copy/move counters from one critical section.
    #[inline]
    pub fn transfer_snapshot(&self) -> TransferStatus<C> {
        self.record.lock().transfers
    }

    /// Returns both the primary and the copy/move counters from one critical
    /// section.
    pub fn full_snapshot(&self) -> (CounterStatus<C>, TransferStatus<C>) {
        let record = self.record.lock();
        (record.status, record.transfers)
    }

    /// Records a default or parameterized construction.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Overflow`] if `created` or `alive` is zero after
    /// the increment. The wrapped values are kept.
    pub fn on_construct(&self) -> Result<()> {
        let mut record = self.record.lock();
        if record.construct() {
            let status = record.status;
            drop(record);
            return Err(self.overflow(status));
        }
        Ok(())
    }

    /// Records a copy construction: as [`on_construct`](Self::on_construct),
    /// plus `copy_constructions`.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Overflow`] if `created` or `alive` wrapped.
    pub fn on_copy_construct(&self) -> Result<()> {
        let mut record = self.record.lock();
        record.transfers.copy_constructions =
            record.transfers.copy_constructions.wrapping_add(&C::one());
        if record.construct() {
            let status = record.status;
            drop(record);
            return Err(self.overflow(status));
        }
        Ok(())
    }

    /// Records a move construction: as [`on_construct`](Self::on_construct),
    /// plus `move_constructions`.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Overflow`] if `created` or `alive` wrapped.
    pub fn on_move_construct(&self) -> Result<()> {
        let mut record = self.record.lock();
        record.transfers.move_constructions =
            record.transfers.move_constructions.wrapping_add(&C::one());
        if record.construct() {
            let status = record.status;
            drop(record);
            return Err(self.overflow(status));
        }
        Ok(())
    }

    /// Records a copy assignment. The primary counters are untouched.
    pub fn on_copy_assign(&self) {
        let mut record = self.record.lock();
        record.transfers.copy_assignments =
            record.transfers.copy_assignments.wrapping_add(&C::one());
    }

    /// Records a move assignment. The primary counters are untouched.
    pub fn on_move_assign(&self) {
        let mut record = self.record.lock();
        record.transfers.move_assignments =
            record.transfers.move_assignments.wrapping_add(&C::one());
    }

    /// Records a destruction.
    ///
    /// If no instance is alive, or the counters are already inconsistent,
    /// sets the sticky `too_many_destructions` flag and leaves `alive` and
    /// `destroyed` unchanged. Never fails.
    pub fn on_destruct(&self) {
        let mut record = self.record.lock();
        if record.destruct() {
            let status = record.status;
            drop(record);
            warn!(
                counted_type = self.name,
                created = %status.created,
                alive = %status.alive,
                destroyed = %status.destroyed,
                "destruction without a matching construction"
            );
        }
    }

    fn overflow(&self, status: CounterStatus<C>) -> CounterError {
        error!(
            counted_type = self.name,
            created = %status.created,
            alive = %status.alive,
            "object counters in overflow"
        );
        CounterError::Overflow {
            type_name: self.name,
        }
    }
}

impl<C: CounterWidth> Default for CounterState<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CounterWidth> Debug for CounterState<C> {
    /// Formats the state as `name{ created:.. alive:.. destroyed:.. }`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (status, transfers) = self.full_snapshot();
        write!(f, "{}{{ {} {} }}", self.name, status, transfers)
    }
}
