//! The zero-sized lifecycle hook embedded in counted types.
//!
//! A counted type keeps a [`Counted<Self>`] field. Creating that field records
//! a construction in the type's [`CounterState`](crate::counters::state::CounterState),
//! and dropping it records a destruction. Because the hook is a field, its
//! `Drop` runs as part of the owner's teardown no matter how the owner is
//! destroyed: by value, through a `Box<dyn Trait>`, inside a collection, or
//! during unwinding.
//!
//! # Construction paths
//!
//! | Event | `Counted` call | Counters touched |
//! |-------|----------------|------------------|
//! | default / parameterized construction | [`Counted::new`] | created, alive |
//! | copy construction | [`Counted::try_clone`], `Clone::clone` | created, alive, copy ctor |
//! | move construction | [`Counted::try_move_from`] | created, alive, move ctor |
//! | copy assignment | [`Counted::assign_from`], `Clone::clone_from` | copy assign |
//! | move assignment | [`Counted::move_assign_from`] | move assign |
//! | destruction | `Drop` | alive, destroyed (or the flag) |
//!
//! Plain Rust moves (`let b = a;`, `vec.push(a)`) relocate the same value and
//! touch no counter. A "move construction" here is the `mem::take` pattern: a
//! new value is built from a live one that stays alive.
//!
//! # Examples
//!
//! ```rust
//! use istanze::counted::Counted;
//! use istanze::counters::{Countable, TransferCountable};
//! use istanze::countable;
//! use istanze::error::Result;
//!
//! #[derive(Debug, PartialEq)]
//! struct Buffer {
//!     data: Vec<u8>,
//!     counted: Counted<Buffer>,
//! }
//!
//! countable!(Buffer, u64, extended);
//!
//! impl Buffer {
//!     fn new(data: Vec<u8>) -> Result<Self> {
//!         Ok(Buffer { data, counted: Counted::new()? })
//!     }
//!
//!     fn take(&mut self) -> Result<Self> {
//!         Ok(Buffer {
//!             data: std::mem::take(&mut self.data),
//!             counted: Counted::try_move_from(&mut self.counted)?,
//!         })
//!     }
//! }
//!
//! impl Clone for Buffer {
//!     fn clone(&self) -> Self {
//!         Buffer { data: self.data.clone(), counted: self.counted.clone() }
//!     }
//!
//!     fn clone_from(&mut self, source: &Self) {
//!         self.data.clone_from(&source.data);
//!         self.counted.clone_from(&source.counted);
//!     }
//! }
//!
//! let mut a = Buffer::new(vec![1, 2, 3])?;
//! let b = a.clone();
//! let c = a.take()?;
//! a.clone_from(&b);
//!
//! assert_eq!(c.data, vec![1, 2, 3]);
//! assert_eq!(Buffer::counter_status().as_tuple(), (3, 3, 0, false));
//! assert_eq!(Buffer::copy_constructions(), 1);
//! assert_eq!(Buffer::move_constructions(), 1);
//! assert_eq!(Buffer::copy_assignments(), 1);
//! # Ok::<(), istanze::error::CounterError>(())
//! ```

use std::cmp::Ordering;
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::counters::Countable;
use crate::error::Result;

/// A zero-sized field that ties the lifetime of its owner to the counters of
/// `T`.
///
/// All `Counted<T>` values compare equal and hash to nothing, so owners can
/// derive `PartialEq`, `Eq`, `Hash`, `PartialOrd` and `Ord` without the field
/// affecting the result.
#[repr(transparent)]
pub struct Counted<T: Countable> {
    _counted: PhantomData<fn() -> T>,
}

impl<T: Countable> Counted<T> {
    /// Records a default or parameterized construction of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Overflow`](crate::error::CounterError::Overflow)
    /// if the counters of `T` wrapped; no `Counted` is produced in that case,
    /// so no destruction will be recorded for it.
    #[inline]
    pub fn new() -> Result<Self> {
        T::counter_state().on_construct()?;
        Ok(Self::hook())
    }

    /// Records a copy construction of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Overflow`](crate::error::CounterError::Overflow)
    /// if the counters of `T` wrapped.
    #[inline]
    pub fn try_clone(&self) -> Result<Self> {
        T::counter_state().on_copy_construct()?;
        Ok(Self::hook())
    }

    /// Records a move construction of `T` out of `source`, which stays alive.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::Overflow`](crate::error::CounterError::Overflow)
    /// if the counters of `T` wrapped.
    #[inline]
    pub fn try_move_from(_source: &mut Self) -> Result<Self> {
        T::counter_state().on_move_construct()?;
        Ok(Self::hook())
    }

    /// Records a copy assignment of `source` into `self`.
    #[inline]
    pub fn assign_from(&mut self, _source: &Self) {
        T::counter_state().on_copy_assign();
    }

    /// Records a move assignment of `source` into `self`. Both stay alive.
    #[inline]
    pub fn move_assign_from(&mut self, _source: &mut Self) {
        T::counter_state().on_move_assign();
    }

    #[inline(always)]
    fn hook() -> Self {
        Counted {
            _counted: PhantomData,
        }
    }
}

impl<T: Countable> Clone for Counted<T> {
    /// Copy construction.
    ///
    /// # Panics
    ///
    /// Panics if the counters of `T` overflow. Use [`Counted::try_clone`] to
    /// handle the overflow instead.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(counted) => counted,
            Err(err) => panic!("{err}"),
        }
    }

    /// Copy assignment: unlike the default implementation, no construction
    /// or destruction is recorded.
    fn clone_from(&mut self, source: &Self) {
        self.assign_from(source);
    }
}

impl<T: Countable> Drop for Counted<T> {
    #[inline]
    fn drop(&mut self) {
        T::counter_state().on_destruct();
    }
}

impl<T: Countable> Debug for Counted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Counted<{}>", T::counter_state().name())
    }
}

impl<T: Countable> Hash for Counted<T> {
    #[inline(always)]
    fn hash<H: Hasher>(&self, _: &mut H) {}
}

impl<T: Countable> PartialEq for Counted<T> {
    #[inline(always)]
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl<T: Countable> Eq for Counted<T> {}

impl<T: Countable> PartialOrd for Counted<T> {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Countable> Ord for Counted<T> {
    #[inline(always)]
    fn cmp(&self, _: &Self) -> Ordering {
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countable;
    use crate::counters::TransferCountable;
    use crate::error::CounterError;
    use std::any::Any;
    use std::mem;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_sized() {
        struct Sized0 {
            _counted: Counted<Sized0>,
        }
        countable!(Sized0);

        assert_eq!(mem::size_of::<Counted<Sized0>>(), 0);
        assert_eq!(mem::size_of::<Sized0>(), 0);
    }

    #[test]
    fn test_construct_and_drop() {
        struct Plain {
            _counted: Counted<Plain>,
        }
        countable!(Plain);

        let a = Plain {
            _counted: Counted::new().unwrap(),
        };
        let b = Plain {
            _counted: Counted::new().unwrap(),
        };
        assert_eq!(Plain::counter_status().as_tuple(), (2, 2, 0, false));

        drop(a);
        assert_eq!(Plain::counter_status().as_tuple(), (2, 1, 1, false));
        drop(b);
        assert_eq!(Plain::counter_status().as_tuple(), (2, 0, 2, false));
    }

    #[test]
    fn test_invariant_after_every_event() {
        struct Tracked {
            _counted: Counted<Tracked>,
        }
        countable!(Tracked, u32);

        let mut live = Vec::new();
        for round in 0..50 {
            live.push(Tracked {
                _counted: Counted::new().unwrap(),
            });
            assert!(Tracked::counter_status().is_consistent());
            if round % 3 == 0 {
                live.pop();
                assert!(Tracked::counter_status().is_consistent());
            }
        }
        live.clear();
        let status = Tracked::counter_status();
        assert!(status.is_consistent());
        assert_eq!(status.alive, 0);
        assert_eq!(status.created, 50);
    }

    #[test]
    fn test_copy_and_move_events() {
        struct Ext {
            counted: Counted<Ext>,
        }
        countable!(Ext, u64, extended);

        let mut original = Ext {
            counted: Counted::new().unwrap(),
        };
        let mut copy = Ext {
            counted: original.counted.clone(),
        };
        copy.counted.clone_from(&original.counted);
        copy.counted.move_assign_from(&mut original.counted);

        assert_eq!(Ext::copy_constructions(), 1);
        assert_eq!(Ext::copy_assignments(), 1);
        assert_eq!(Ext::move_constructions(), 0);
        assert_eq!(Ext::move_assignments(), 1);
        // assignments created and destroyed nothing
        assert_eq!(Ext::counter_status().as_tuple(), (2, 2, 0, false));

        let moved = Ext {
            counted: Counted::try_move_from(&mut original.counted).unwrap(),
        };
        assert_eq!(Ext::move_constructions(), 1);
        assert_eq!(Ext::counter_status().as_tuple(), (3, 3, 0, false));

        drop((original, copy, moved));
        assert_eq!(Ext::counter_status().as_tuple(), (3, 0, 3, false));
    }

    #[test]
    fn test_plain_moves_touch_nothing() {
        struct Moved {
            _counted: Counted<Moved>,
        }
        countable!(Moved, u64, extended);

        let mut loose: Vec<Moved> = (0..5)
            .map(|_| Moved {
                _counted: Counted::new().unwrap(),
            })
            .collect::<Vec<_>>();
        assert_eq!(Moved::counter_status().as_tuple(), (5, 5, 0, false));

        let collection: Vec<Moved> = loose.drain(..3).collect();
        assert_eq!(collection.len(), 3);
        assert_eq!(Moved::counter_status().as_tuple(), (5, 5, 0, false));
        assert_eq!(Moved::move_constructions(), 0);
        assert_eq!(Moved::move_assignments(), 0);

        drop(collection);
        drop(loose);
        assert_eq!(Moved::counter_status().as_tuple(), (5, 0, 5, false));
    }

    #[test]
    fn test_drop_through_trait_object() {
        trait Shape {
            fn sides(&self) -> u32;
        }
        struct Square {
            _counted: Counted<Square>,
        }
        impl Shape for Square {
            fn sides(&self) -> u32 {
                4
            }
        }
        countable!(Square);

        let shapes: Vec<Box<dyn Shape>> = (0..3)
            .map(|_| {
                Box::new(Square {
                    _counted: Counted::new().unwrap(),
                }) as Box<dyn Shape>
            })
            .collect();
        assert_eq!(shapes.iter().map(|s| s.sides()).sum::<u32>(), 12);

        let erased: Box<dyn Any> = Box::new(Square {
            _counted: Counted::new().unwrap(),
        });
        assert_eq!(Square::objects_alive(), 4);

        drop(shapes);
        drop(erased);
        assert_eq!(Square::counter_status().as_tuple(), (4, 0, 4, false));
    }

    #[test]
    fn test_overflow_prevents_construction() {
        struct Small {
            _counted: Counted<Small>,
        }
        countable!(Small, u8);

        for _ in 0..255 {
            let _s = Small {
                _counted: Counted::new().unwrap(),
            };
        }
        let result = Counted::<Small>::new();
        assert_eq!(
            result.err(),
            Some(CounterError::Overflow { type_name: "Small" })
        );
    }

    #[test]
    fn test_overflow_u16_at_wrap() {
        struct Medium {
            _counted: Counted<Medium>,
        }
        countable!(Medium, u16);

        for _ in 0..u16::MAX {
            let _m = Medium {
                _counted: Counted::new().unwrap(),
            };
        }
        assert!(Counted::<Medium>::new().is_err());
    }

    #[test]
    fn test_too_many_destructions_after_overflow() {
        struct Crowded {
            _counted: Counted<Crowded>,
        }
        countable!(Crowded, u8);

        let live: Vec<Crowded> = (0..255)
            .map(|_| Crowded {
                _counted: Counted::new().unwrap(),
            })
            .collect();
        assert!(Counted::<Crowded>::new().is_err());
        assert!(!Crowded::too_many_destructions());

        drop(live);
        assert!(Crowded::too_many_destructions());
        assert_eq!(Crowded::objects_destroyed(), 0);
    }

    #[test]
    #[should_panic(expected = "in overflow")]
    fn test_clone_panics_on_overflow() {
        struct Cloned {
            counted: Counted<Cloned>,
        }
        countable!(Cloned, u8);

        let first = Cloned {
            counted: Counted::new().unwrap(),
        };
        let mut copies = Vec::new();
        for _ in 0..255 {
            copies.push(first.counted.clone());
        }
    }

    #[test]
    fn test_try_clone_reports_overflow() {
        struct TryCloned {
            counted: Counted<TryCloned>,
        }
        countable!(TryCloned, u8);

        let first = TryCloned {
            counted: Counted::new().unwrap(),
        };
        let copies: Vec<_> = (0..254).map(|_| first.counted.try_clone().unwrap()).collect();
        assert_eq!(copies.len(), 254);
        assert!(first.counted.try_clone().is_err());
    }

    #[test]
    fn test_derives_ignore_field() {
        #[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        struct Point {
            x: i32,
            counted: Counted<Point>,
        }
        countable!(Point);

        let a = Point {
            x: 1,
            counted: Counted::new().unwrap(),
        };
        let b = Point {
            x: 1,
            counted: Counted::new().unwrap(),
        };
        let c = Point {
            x: 2,
            counted: Counted::new().unwrap(),
        };
        assert_eq!(a, b);
        assert!(a < c);
        assert_eq!(format!("{:?}", a.counted), "Counted<Point>");
    }

    #[test]
    fn test_concurrent_construction() {
        struct Shared {
            _counted: Counted<Shared>,
        }
        countable!(Shared);

        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 2_000;

        let barrier = Arc::new(std::sync::Barrier::new(THREADS as usize));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..PER_THREAD {
                        let _s = Shared {
                            _counted: Counted::new().unwrap(),
                        };
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let status = Shared::counter_status();
        assert_eq!(
            status.as_tuple(),
            (THREADS * PER_THREAD, 0, THREADS * PER_THREAD, false)
        );
    }
}
