//! # aplus - Bounded-Concurrency Async Iteration
//!
//! Run a collection of independent async tasks with at most `N` of them in
//! flight, get every value back in the order (or under the key) the task came
//! in, and stop launching work at the first failure.
//!
//! ## Features
//!
//! - **Shape preserving** - a `Vec` of tasks gives a sequence of values, a keyed
//!   map of tasks gives a map of values with the same keys
//! - **Bounded** - `series` (one at a time), `parallel` (no cap) and
//!   `parallel_limit` (cap of `n`) all share one engine
//! - **Fail fast** - the first error to arrive is returned untouched; nothing
//!   else is started afterwards
//! - **Any outcome** - tasks may return a plain value, a future, or a
//!   callback-style [`Thenable`]
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! aplus = "1.0.0"
//! ```
//!
//! ### Basic Usage
//!
//! ```rust
//! use aplus::{parallel_limit, task, Collection, Settle};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tasks: Vec<_> = [30u64, 10, 20]
//!     .into_iter()
//!     .map(|ms| {
//!         task(move || {
//!             Settle::<_, std::io::Error>::deferred(async move {
//!                 tokio::time::sleep(Duration::from_millis(ms)).await;
//!                 Ok(ms)
//!             })
//!         })
//!     })
//!     .collect();
//!
//! // Two at a time; values come back in input order, not completion order.
//! let values = parallel_limit(tasks, 2)?.await?;
//! assert_eq!(values, Collection::Sequence(vec![30, 10, 20]));
//! # Ok(())
//! # }
//! ```
//!
//! ### Keyed Tasks
//!
//! ```rust
//! use aplus::{parallel, task, Settle, TaskCollection};
//!
//! # tokio_test::block_on(async {
//! let tasks = TaskCollection::keyed([
//!     ("one", task(|| Settle::<_, ()>::value(1))),
//!     ("two", task(|| Settle::deferred(async { Ok(2) }))),
//! ])?;
//!
//! let values = parallel(tasks).await.unwrap().into_keyed().unwrap();
//! assert_eq!(values.get("two"), Some(&2));
//! # Ok::<(), aplus::Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Tasks → TaskCollection (normalize) → BoundedIter (schedule) → Settle (adapt) → Collection
//! ```
//!
//! ### Main Components
//!
//! - [`TaskCollection`] - Sequence or keyed input, decided once
//! - [`BoundedIter`] - The engine every entry point reduces to
//! - [`Settle`] - What a task returned: immediate, deferred or thenable
//! - [`Collection`] - Results in the input's shape
//! - [`IterConfig`] / [`Limit`] - Concurrency cap and tracing label
//!
//! ## Error Handling
//!
//! A task's error is the caller's own type and comes back as-is. Misuse of the
//! API (a zero limit, repeated keys) is reported as [`Error`] before anything
//! runs:
//!
//! ```rust
//! use aplus::{parallel_limit, task, Error, Settle};
//!
//! let tasks = vec![task(|| Settle::<u8, ()>::value(1))];
//! assert_eq!(parallel_limit(tasks, 0).unwrap_err(), Error::InvalidLimit(0));
//! ```

/// Version of the aplus crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod collection;
pub mod combinators;
pub mod error;
pub mod parallel;
pub mod runtime;

// Re-export main types
pub use collection::{Collection, OrderedMap, TaskCollection};
pub use combinators::*;
pub use error::{Error, Result};
pub use parallel::{BoundedIter, IterConfig, Limit};
pub use runtime::{task, BoxTask, Deferred, Resolver, Settle, Thenable};
