//! Bounded-concurrency execution for aplus
//!
//! Provides the iterator every entry point reduces to, plus its configuration.

mod config;
mod executor;

pub use config::{IterConfig, Limit};
pub use executor::BoundedIter;
