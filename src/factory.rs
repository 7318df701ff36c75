//! Factories producing heap-owned values from bound constructor arguments.
//!
//! An [`ObjectFactory<T>`] binds a set of constructor arguments once and then
//! produces a fresh `Box<T>` every time [`create`](ObjectFactory::create) is
//! called. The factory holds no counters of its own: if `T` is counted, each
//! produced value is counted by its own construction.
//!
//! # Examples
//!
//! ```rust
//! use istanze::factory::ObjectFactory;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! let origin = ObjectFactory::<Point>::from_default();
//! assert_eq!(*origin.create(), Point { x: 0, y: 0 });
//!
//! let factory = ObjectFactory::new((11, 22), |(x, y)| Point { x, y });
//! let a = factory.create();
//! let b = factory.create();
//! assert_eq!(*a, *b);
//! ```

use std::fmt::{self, Debug};
use std::sync::Arc;

/// A cloneable, thread-safe producer of new `Box<T>` values.
pub struct ObjectFactory<T> {
    make: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T: 'static> ObjectFactory<T> {
    /// Binds `args` to `ctor`.
    ///
    /// Every call to [`create`](Self::create) passes a fresh clone of `args`
    /// to `ctor`. Use a tuple to bind several arguments and `()` for none.
    pub fn new<A, F>(args: A, ctor: F) -> Self
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        ObjectFactory {
            make: Arc::new(move || ctor(args.clone())),
        }
    }

    /// A factory producing `T::default()`.
    pub fn from_default() -> Self
    where
        T: Default,
    {
        ObjectFactory {
            make: Arc::new(T::default),
        }
    }

    /// Produces a new, independently owned value.
    pub fn create(&self) -> Box<T> {
        Box::new((self.make)())
    }
}

impl<T: 'static, E: 'static> ObjectFactory<Result<T, E>> {
    /// Produces a new value from a fallible constructor.
    ///
    /// # Errors
    ///
    /// Returns whatever error the bound constructor returns, such as
    /// [`CounterError::Overflow`](crate::error::CounterError::Overflow) for
    /// counted types.
    pub fn try_create(&self) -> Result<Box<T>, E> {
        (self.make)().map(Box::new)
    }
}

impl<T> Clone for ObjectFactory<T> {
    fn clone(&self) -> Self {
        ObjectFactory {
            make: Arc::clone(&self.make),
        }
    }
}

impl<T> Debug for ObjectFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectFactory")
            .field("produces", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}
