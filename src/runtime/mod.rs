//! Runtime values exchanged between tasks and the iterator

mod settle;

pub use settle::{task, BoxTask, Deferred, Resolver, Settle, Thenable};
