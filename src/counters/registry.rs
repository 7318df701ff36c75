//! Counter states keyed by type identity.
//!
//! A `static` declared inside a generic function is shared by every
//! instantiation of that function, so a generic type such as `Slot<T>` cannot
//! get one state per `T` from [`countable!`](crate::countable). Those types
//! look their state up here instead: the first lookup for a type creates its
//! state, and every later lookup returns the same `&'static` reference.
//!
//! States are created on demand and leaked, so they live until the process
//! exits. Lookups work regardless of global initialization order. Each
//! counter width has its own registry.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt::{self, Debug};

use parking_lot::RwLock;
use tracing::debug;

use crate::counters::state::CounterState;
use crate::counters::CounterWidth;

/// Lazily populated map from `TypeId` to the state of that type.
#[doc(hidden)]
pub struct TypeRegistry<C: CounterWidth> {
    states: RwLock<HashMap<TypeId, &'static CounterState<C>>>,
}

impl<C: CounterWidth> TypeRegistry<C> {
    pub(crate) fn new() -> Self {
        TypeRegistry {
            states: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_register<T: ?Sized + 'static>(&self) -> &'static CounterState<C> {
        let key = TypeId::of::<T>();
        if let Some(state) = self.states.read().get(&key).copied() {
            return state;
        }

        // another thread may have registered T between the two locks
        let mut states = self.states.write();
        let state = *states.entry(key).or_insert_with(|| {
            debug!(counted_type = type_name::<T>(), "registering counter state");
            Box::leak(Box::new(CounterState::named(type_name::<T>())))
        });
        state
    }

    fn len(&self) -> usize {
        self.states.read().len()
    }
}

impl<C: CounterWidth> Debug for TypeRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .finish()
    }
}

/// Returns the state of `T` among the counters of width `C`, creating it on
/// first use.
///
/// Meant for [`Countable::counter_state`](crate::counters::Countable::counter_state)
/// implementations of generic types.
pub fn counter_state<T: ?Sized + 'static, C: CounterWidth>() -> &'static CounterState<C> {
    C::registry().get_or_register::<T>()
}

/// Number of types registered with counters of width `C`.
pub fn registered_types<C: CounterWidth>() -> usize {
    C::registry().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counted::Counted;
    use crate::counters::Countable;
    use std::ptr;
    use std::thread;

    struct Slot<T: 'static> {
        value: T,
        _counted: Counted<Slot<T>>,
    }

    impl<T: 'static> Countable for Slot<T> {
        type Width = u32;

        fn counter_state() -> &'static CounterState<u32> {
            counter_state::<Self, u32>()
        }
    }

    impl<T: 'static> Slot<T> {
        fn new(value: T) -> crate::error::Result<Self> {
            Ok(Slot {
                value,
                _counted: Counted::new()?,
            })
        }
    }

    #[test]
    fn test_same_type_same_state() {
        struct Marker;
        let a = counter_state::<Marker, u64>();
        let b = counter_state::<Marker, u64>();
        assert!(ptr::eq(a, b));
        assert!(a.name().ends_with("Marker"));
    }

    #[test]
    fn test_distinct_types_distinct_states() {
        struct First;
        struct Second;
        let a = counter_state::<First, u64>();
        let b = counter_state::<Second, u64>();
        assert!(!ptr::eq(a, b));

        a.on_construct().unwrap();
        assert_eq!(a.snapshot().created, 1);
        assert_eq!(b.snapshot().created, 0);
    }

    #[test]
    fn test_registered_types_grows() {
        struct Fresh;
        let before = registered_types::<u16>();
        counter_state::<Fresh, u16>();
        counter_state::<Fresh, u16>();
        assert!(registered_types::<u16>() >= before + 1);
    }

    #[test]
    fn test_generic_instantiations_are_independent() {
        let bytes: Vec<Slot<u8>> = (0..4).map(|i| Slot::new(i).unwrap()).collect();
        let words = Slot::new(7u16).unwrap();

        assert_eq!(Slot::<u8>::objects_alive(), 4);
        assert_eq!(Slot::<u16>::objects_alive(), 1);
        assert_eq!(Slot::<u32>::objects_alive(), 0);
        assert_eq!(bytes[3].value, 3);
        assert_eq!(words.value, 7);

        drop(bytes);
        assert_eq!(Slot::<u8>::counter_status().as_tuple(), (4, 0, 4, false));
        assert_eq!(Slot::<u16>::objects_alive(), 1);
    }

    #[test]
    fn test_concurrent_first_use() {
        struct Contended;
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| counter_state::<Contended, u64>() as *const _ as usize))
            .collect();

        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
    }
}
