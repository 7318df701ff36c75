//! Observer implementations for presenting a [`Census`](crate::census::Census).
//!
//! - [`table`] - Pretty-print the counters of several types as a table using
//!   the `tabled` crate
//!
//! # Feature Flags
//!
//! Each observer is gated behind a feature flag to minimize dependencies:
//!
//! - `table` - Enables the [`table`] module
//! - `full` - Enables all observer modules
//!
//! # Example
//!
//! ```rust,ignore
//! use istanze::census::Census;
//! use istanze::observers::table::TableObserver;
//!
//! let census = Census::new().track::<Request>().track_extended::<Session>();
//! println!("{}", TableObserver::new().render(census.collect().iter()));
//! ```

#[cfg(feature = "table")]
pub mod table;
