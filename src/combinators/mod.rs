//! Entry points built on the bounded iterator
//!
//! Parallel/series/limited runs over tasks, worker-driven maps, ordered
//! filters, and argument-binding wrappers.

mod apply;
mod filter;
mod map;
mod parallel;

pub use apply::{apply, apply_each, apply_each_limit, apply_each_series, Applied, AppliedEach};
pub use filter::{filter, filter_limit, filter_series, reject, reject_limit, reject_series};
pub use map::{map, map_limit, map_series, map_with};
pub use parallel::{
    each, each_limit, each_series, parallel, parallel_limit, series, Each, Parallel,
};
