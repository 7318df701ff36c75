//! Core module containing the per-type counter record and the traits a
//! counted type implements.
//!
//! Every counted type `T` owns exactly one [`CounterState`], shared by all of
//! its instances and by every thread of the process. Instances carry no
//! counter storage at all: the [`Counted`](crate::counted::Counted) field they
//! embed is zero-sized and only reaches the shared state through
//! [`Countable::counter_state`].
//!
//! # Architecture
//!
//! ```text
//!   Widget #1 ─┐                    ┌───────────────────────────────┐
//!   Widget #2 ─┼── Counted<Widget> ─►  CounterState<u64> (Widget)   │
//!   Widget #3 ─┘      (0 bytes)     │  created alive destroyed flag │
//!                                   │  copy/move ctor, copy/move =  │
//!                                   └───────────────────────────────┘
//!   Gadget #1 ──── Counted<Gadget> ─►  CounterState<u16> (Gadget)
//! ```
//!
//! The state of a concrete type lives in a function-local `static`
//! generated by [`countable!`](crate::countable). Generic types cannot own a
//! `static` per instantiation, so they look their state up in the
//! [`registry`], keyed by `TypeId`.
//!
//! # Counter width
//!
//! The width of the counters is selected per type through
//! [`Countable::Width`]. `u64` is the default used by the macro; narrower
//! widths overflow sooner, which is reported as
//! [`CounterError::Overflow`](crate::error::CounterError::Overflow) on the
//! construction that wraps a counter.

pub mod registry;
pub mod state;

use std::fmt::{self, Debug, Display};

use num_traits::{PrimInt, Unsigned, WrappingAdd};
use once_cell::sync::Lazy;

use self::registry::TypeRegistry;
use self::state::CounterState;

mod sealed {
    pub trait Sealed {}
}

/// An unsigned integer type usable as a lifecycle counter.
///
/// Implemented for `u8`, `u16`, `u32`, `u64` and `usize`. The trait is
/// sealed.
pub trait CounterWidth:
    sealed::Sealed + PrimInt + Unsigned + WrappingAdd + Debug + Display + Send + Sync + 'static
{
    /// The zero value, usable in `const` context.
    const ZERO: Self;

    /// Converts the value to `u64` for width-independent reporting.
    #[inline]
    fn widen(self) -> u64 {
        self.to_u64().unwrap_or(u64::MAX)
    }

    /// Registry of lazily created states for counted types of this width.
    #[doc(hidden)]
    fn registry() -> &'static TypeRegistry<Self>;
}

macro_rules! impl_counter_width {
    ($($width:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $width {}

            impl CounterWidth for $width {
                const ZERO: Self = 0;

                fn registry() -> &'static TypeRegistry<Self> {
                    static REGISTRY: Lazy<TypeRegistry<$width>> = Lazy::new(TypeRegistry::new);
                    &REGISTRY
                }
            }
        )*
    };
}

impl_counter_width!(u8, u16, u32, u64, usize);

/// Point-in-time view of the primary counters of a type.
///
/// Always read from a single critical section: `created`, `alive` and
/// `destroyed` are never observed half-updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CounterStatus<C> {
    /// Total constructions ever observed.
    pub created: C,
    /// Currently live instances.
    pub alive: C,
    /// Total destructions ever observed.
    pub destroyed: C,
    /// Sticky flag set by a destruction that could not be matched to a live
    /// instance.
    pub too_many_destructions: bool,
}

impl<C: CounterWidth> CounterStatus<C> {
    pub(crate) const fn zeroed() -> Self {
        Self {
            created: C::ZERO,
            alive: C::ZERO,
            destroyed: C::ZERO,
            too_many_destructions: false,
        }
    }

    /// Returns the status as a `(created, alive, destroyed, too_many_destructions)` tuple.
    pub fn as_tuple(&self) -> (C, C, C, bool) {
        (
            self.created,
            self.alive,
            self.destroyed,
            self.too_many_destructions,
        )
    }

    /// Returns `true` if the flag is clear and `created == alive + destroyed`.
    ///
    /// The sum is computed modulo the counter width, like the counters
    /// themselves.
    pub fn is_consistent(&self) -> bool {
        !self.too_many_destructions && self.created == self.alive.wrapping_add(&self.destroyed)
    }

    /// Converts every counter to `u64`.
    pub fn widen(&self) -> CounterStatus<u64> {
        CounterStatus {
            created: self.created.widen(),
            alive: self.alive.widen(),
            destroyed: self.destroyed.widen(),
            too_many_destructions: self.too_many_destructions,
        }
    }
}

impl<C> From<CounterStatus<C>> for (C, C, C, bool) {
    fn from(status: CounterStatus<C>) -> Self {
        (
            status.created,
            status.alive,
            status.destroyed,
            status.too_many_destructions,
        )
    }
}

impl<C: Display> Display for CounterStatus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created:{} alive:{} destroyed:{}",
            self.created, self.alive, self.destroyed
        )?;
        if self.too_many_destructions {
            write!(f, " (too many destructions)")?;
        }
        Ok(())
    }
}

/// Point-in-time view of the copy and move counters of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransferStatus<C> {
    /// Copy constructions (`clone`).
    pub copy_constructions: C,
    /// Copy assignments (`clone_from`).
    pub copy_assignments: C,
    /// Move constructions (a new value taken out of a live one).
    pub move_constructions: C,
    /// Move assignments (a live value overwritten by taking from another).
    pub move_assignments: C,
}

impl<C: CounterWidth> TransferStatus<C> {
    pub(crate) const fn zeroed() -> Self {
        Self {
            copy_constructions: C::ZERO,
            copy_assignments: C::ZERO,
            move_constructions: C::ZERO,
            move_assignments: C::ZERO,
        }
    }

    /// Converts every counter to `u64`.
    pub fn widen(&self) -> TransferStatus<u64> {
        TransferStatus {
            copy_constructions: self.copy_constructions.widen(),
            copy_assignments: self.copy_assignments.widen(),
            move_constructions: self.move_constructions.widen(),
            move_assignments: self.move_assignments.widen(),
        }
    }
}

impl<C: Display> Display for TransferStatus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "copy-ctor:{} copy-assign:{} move-ctor:{} move-assign:{}",
            self.copy_constructions,
            self.copy_assignments,
            self.move_constructions,
            self.move_assignments
        )
    }
}

/// A type whose instances are tracked by a shared lifecycle counter record.
///
/// Implement it with [`countable!`](crate::countable) for concrete types, or
/// by hand with [`registry::counter_state`] for generic types, then embed a
/// [`Counted<Self>`](crate::counted::Counted) field.
///
/// All the associated functions below are safe to call from any thread,
/// including before the first instance has been constructed, in which case
/// they report zero.
///
/// # Examples
///
/// ```rust
/// use istanze::counted::Counted;
/// use istanze::counters::Countable;
/// use istanze::countable;
///
/// struct Connection {
///     _counted: Counted<Connection>,
/// }
///
/// countable!(Connection);
///
/// assert_eq!(Connection::objects_alive(), 0);
/// {
///     let _conn = Connection { _counted: Counted::new()? };
///     assert_eq!(Connection::objects_alive(), 1);
/// }
/// assert_eq!(Connection::counter_status().as_tuple(), (1, 0, 1, false));
/// # Ok::<(), istanze::error::CounterError>(())
/// ```
///
/// Generic types use the registry, so each instantiation gets its own state:
///
/// ```rust
/// use istanze::counted::Counted;
/// use istanze::counters::{registry, state::CounterState, Countable};
///
/// struct Slot<T: 'static> {
///     value: T,
///     _counted: Counted<Slot<T>>,
/// }
///
/// impl<T: 'static> Countable for Slot<T> {
///     type Width = u64;
///
///     fn counter_state() -> &'static CounterState<u64> {
///         registry::counter_state::<Self, u64>()
///     }
/// }
///
/// let _a = Slot { value: 1u8, _counted: Counted::new()? };
/// assert_eq!(Slot::<u8>::objects_alive(), 1);
/// assert_eq!(Slot::<u16>::objects_alive(), 0);
/// # Ok::<(), istanze::error::CounterError>(())
/// ```
pub trait Countable {
    /// Width of the counters of this type.
    type Width: CounterWidth;

    /// Returns the state shared by every instance of this type.
    fn counter_state() -> &'static CounterState<Self::Width>;

    /// Total constructions ever observed.
    fn objects_created() -> Self::Width {
        Self::counter_state().snapshot().created
    }

    /// Currently live instances.
    fn objects_alive() -> Self::Width {
        Self::counter_state().snapshot().alive
    }

    /// Total destructions ever observed.
    fn objects_destroyed() -> Self::Width {
        Self::counter_state().snapshot().destroyed
    }

    /// Whether a destruction could not be matched to a live instance.
    fn too_many_destructions() -> bool {
        Self::counter_state().snapshot().too_many_destructions
    }

    /// All primary counters, read in one critical section.
    fn counter_status() -> CounterStatus<Self::Width> {
        Self::counter_state().snapshot()
    }
}

/// A [`Countable`] type that also exposes its copy and move counters.
///
/// The counters are recorded for every counted type; this trait only opts a
/// type into the extended query surface. Use the `extended` form of
/// [`countable!`](crate::countable) or an empty `impl`.
pub trait TransferCountable: Countable {
    /// Copy constructions (`clone`).
    fn copy_constructions() -> Self::Width {
        Self::counter_state().transfer_snapshot().copy_constructions
    }

    /// Copy assignments (`clone_from`).
    fn copy_assignments() -> Self::Width {
        Self::counter_state().transfer_snapshot().copy_assignments
    }

    /// Move constructions.
    fn move_constructions() -> Self::Width {
        Self::counter_state().transfer_snapshot().move_constructions
    }

    /// Move assignments.
    fn move_assignments() -> Self::Width {
        Self::counter_state().transfer_snapshot().move_assignments
    }

    /// All copy and move counters, read in one critical section.
    fn transfer_status() -> TransferStatus<Self::Width> {
        Self::counter_state().transfer_snapshot()
    }
}

/// Implements [`Countable`] for a concrete type with a dedicated `static`
/// state.
///
/// ```rust
/// use istanze::countable;
/// # use istanze::counted::Counted;
/// # struct Widget { _c: Counted<Widget> }
/// # struct Gadget { _c: Counted<Gadget> }
/// # struct Sprocket { _c: Counted<Sprocket> }
///
/// countable!(Widget);                 // u64 counters
/// countable!(Gadget, u16);            // u16 counters
/// countable!(Sprocket, u32, extended); // also implements TransferCountable
/// ```
#[macro_export]
macro_rules! countable {
    ($ty:ty, $width:ty, extended) => {
        $crate::countable!($ty, $width);

        impl $crate::counters::TransferCountable for $ty {}
    };
    ($ty:ty, $width:ty) => {
        impl $crate::counters::Countable for $ty {
            type Width = $width;

            fn counter_state() -> &'static $crate::counters::state::CounterState<$width> {
                static STATE: $crate::counters::state::CounterState<$width> =
                    $crate::counters::state::CounterState::named(::core::stringify!($ty));
                &STATE
            }
        }
    };
    ($ty:ty) => {
        $crate::countable!($ty, u64);
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counted::Counted;

    #[test]
    fn test_status_zeroed() {
        let status = CounterStatus::<u16>::zeroed();
        assert_eq!(status.as_tuple(), (0, 0, 0, false));
        assert!(status.is_consistent());
        assert_eq!(status, CounterStatus::default());
    }

    #[test]
    fn test_status_consistency() {
        let mut status = CounterStatus::<u8> {
            created: 10,
            alive: 4,
            destroyed: 6,
            too_many_destructions: false,
        };
        assert!(status.is_consistent());

        status.destroyed = 7;
        assert!(!status.is_consistent());

        status.destroyed = 6;
        status.too_many_destructions = true;
        assert!(!status.is_consistent());
    }

    #[test]
    fn test_status_consistency_is_modular() {
        // created wrapped after 256 constructions, 255 of them destroyed
        let status = CounterStatus::<u8> {
            created: 0,
            alive: 1,
            destroyed: 255,
            too_many_destructions: false,
        };
        assert!(status.is_consistent());
    }

    #[test]
    fn test_status_display() {
        let status = CounterStatus::<u64> {
            created: 5,
            alive: 2,
            destroyed: 3,
            too_many_destructions: false,
        };
        assert_eq!(status.to_string(), "created:5 alive:2 destroyed:3");

        let flagged = CounterStatus {
            too_many_destructions: true,
            ..status
        };
        assert!(flagged.to_string().ends_with("(too many destructions)"));
    }

    #[test]
    fn test_status_into_tuple() {
        let status = CounterStatus::<u32> {
            created: 3,
            alive: 1,
            destroyed: 2,
            too_many_destructions: false,
        };
        let tuple: (u32, u32, u32, bool) = status.into();
        assert_eq!(tuple, (3, 1, 2, false));
    }

    #[test]
    fn test_widen() {
        assert_eq!(u8::MAX.widen(), 255);
        assert_eq!(usize::MAX.widen(), usize::MAX as u64);

        let transfers = TransferStatus::<u16> {
            copy_constructions: 1,
            copy_assignments: 2,
            move_constructions: 3,
            move_assignments: 4,
        };
        assert_eq!(
            transfers.widen(),
            TransferStatus::<u64> {
                copy_constructions: 1,
                copy_assignments: 2,
                move_constructions: 3,
                move_assignments: 4,
            }
        );
    }

    #[test]
    fn test_accessors_before_first_use() {
        struct Untouched {
            _counted: Counted<Untouched>,
        }
        countable!(Untouched, u64, extended);

        assert_eq!(Untouched::objects_created(), 0);
        assert_eq!(Untouched::objects_alive(), 0);
        assert_eq!(Untouched::objects_destroyed(), 0);
        assert!(!Untouched::too_many_destructions());
        assert_eq!(Untouched::counter_status(), CounterStatus::default());
        assert_eq!(Untouched::transfer_status(), TransferStatus::default());
    }

    #[test]
    fn test_macro_width_and_name() {
        struct Narrow {
            _counted: Counted<Narrow>,
        }
        countable!(Narrow, u16);

        let _n = Narrow {
            _counted: Counted::new().unwrap(),
        };
        let created: u16 = Narrow::objects_created();
        assert_eq!(created, 1);
        assert_eq!(Narrow::counter_state().name(), "Narrow");
    }

    #[test]
    fn test_independent_types() {
        struct Left {
            _counted: Counted<Left>,
        }
        struct Right {
            _counted: Counted<Right>,
        }
        countable!(Left);
        countable!(Right);

        let lefts: Vec<Left> = (0..3)
            .map(|_| Left {
                _counted: Counted::new().unwrap(),
            })
            .collect();

        assert_eq!(Left::objects_alive(), 3);
        assert_eq!(Right::counter_status(), CounterStatus::default());
        drop(lefts);
        assert_eq!(Right::objects_created(), 0);
        assert_eq!(Left::counter_status().as_tuple(), (3, 0, 3, false));
    }
}
