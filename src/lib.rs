//! # Istanze - Per-Type Lifecycle Counters
//!
//! A Rust library that lets any type count its own instances: how many have
//! ever been constructed, how many are alive right now, how many have been
//! destroyed, and whether a destruction was ever observed that could not be
//! matched to a construction. Counted types pay **zero bytes per instance**:
//! the counters are shared, per-type state.
//!
//! ## How It Works
//!
//! A counted type embeds a zero-sized [`Counted<Self>`](counted::Counted)
//! field and implements [`Countable`](counters::Countable), usually through
//! the [`countable!`] macro:
//!
//! 1. **Per-Type State**: every counted type owns exactly one
//!    [`CounterState`](counters::state::CounterState), selected at compile
//!    time through the trait. Two types never share counters or locks.
//!
//! 2. **RAII Hooks**: creating the `Counted` field records a construction,
//!    dropping it records a destruction. The destruction hook runs as part of
//!    the owner's own teardown, so it cannot be skipped by dropping the owner
//!    through a trait object.
//!
//! 3. **One Lock per Type**: every update and every snapshot holds the
//!    type's lock for its whole duration, so a snapshot never sees
//!    `created` incremented without `alive`.
//!
//! 4. **Detect, Don't Recover**: a construction that wraps a counter fails
//!    with [`CounterError::Overflow`](error::CounterError::Overflow) and the
//!    counters stay wrapped. A destruction that does not match a live
//!    instance sets a sticky flag instead of failing.
//!
//! ## Quick Start
//!
//! ```rust
//! use istanze::counted::Counted;
//! use istanze::counters::Countable;
//! use istanze::countable;
//! use istanze::error::Result;
//!
//! struct Request {
//!     id: u32,
//!     _counted: Counted<Request>,
//! }
//!
//! countable!(Request);
//!
//! impl Request {
//!     fn new(id: u32) -> Result<Self> {
//!         Ok(Request { id, _counted: Counted::new()? })
//!     }
//! }
//!
//! let first = Request::new(1)?;
//! {
//!     let _second = Request::new(2)?;
//!     assert_eq!(Request::objects_alive(), 2);
//! }
//!
//! assert_eq!(Request::counter_status().as_tuple(), (2, 1, 1, false));
//! assert_eq!(first.id, 1);
//! # Ok::<(), istanze::error::CounterError>(())
//! ```
//!
//! ## Counter Width
//!
//! | Macro form | Counters | Extended surface |
//! |------------|----------|------------------|
//! | `countable!(T)` | `u64` | no |
//! | `countable!(T, u16)` | `u16` | no |
//! | `countable!(T, u32, extended)` | `u32` | [`TransferCountable`](counters::TransferCountable) |
//!
//! A narrow width is useful to bound the number of instances a type may ever
//! produce: the construction that wraps the counter fails.
//!
//! ## Copy and Move Tracking
//!
//! Types implementing [`TransferCountable`](counters::TransferCountable) also
//! expose how many copy constructions (`clone`), copy assignments
//! (`clone_from`), move constructions and move assignments were recorded.
//! See the [`counted`] module for how each event maps onto Rust.
//!
//! ## Thread Safety
//!
//! Counted values can be created and dropped on any thread, and every query
//! can be made from any thread, including before the first instance exists.
//!
//! ## Factories and Observers
//!
//! [`factory::ObjectFactory`] binds constructor arguments once and produces
//! fresh boxed values on demand. [`census::Census`] reads several types at
//! once, and with the `table` feature [`observers`] render it:
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | `table` | `observers::table` | Pretty-print a census as an ASCII table |
//! | `full` | All observers | Enables all observer modules |

pub mod census;
pub mod counted;
pub mod counters;
pub mod error;
pub mod factory;
pub mod observers;
