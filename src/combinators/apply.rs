//! Argument-binding wrappers.
//!
//! [`apply`] and the [`apply_each`] family pre-bind leading arguments to
//! workers. Calling the result appends the trailing arguments and runs the
//! worker(s), normalizing whatever they return.

use crate::collection::{Collection, TaskCollection};
use crate::error::Result;
use crate::parallel::{BoundedIter, IterConfig};
use crate::runtime::{Deferred, Settle};
use futures_util::future::{BoxFuture, FutureExt};

/// A worker with leading arguments already bound
#[derive(Debug, Clone)]
pub struct Applied<W, A> {
    worker: W,
    bound: Vec<A>,
}

/// Bind leading arguments to a single worker.
///
/// # Example
/// ```
/// use aplus::{apply, Settle};
///
/// # tokio_test::block_on(async {
/// let sum = apply(|args: Vec<i32>| Settle::<_, ()>::value(args.iter().sum::<i32>()), [1, 2]);
/// assert_eq!(sum.call(vec![3, 4]).await, Ok(10));
/// assert_eq!(sum.call(vec![]).await, Ok(3));
/// # });
/// ```
pub fn apply<W, A>(worker: W, bound: impl IntoIterator<Item = A>) -> Applied<W, A> {
    Applied {
        worker,
        bound: bound.into_iter().collect(),
    }
}

impl<W, A: Clone> Applied<W, A> {
    /// Arguments bound so far
    pub fn bound(&self) -> &[A] {
        &self.bound
    }

    /// Invoke the worker now with `bound ++ trailing`; the returned future
    /// carries its outcome.
    pub fn call<'a, T, E>(&self, trailing: Vec<A>) -> Deferred<'a, T, E>
    where
        W: Fn(Vec<A>) -> Settle<'a, T, E>,
        T: Send + 'a,
        E: Send + 'a,
    {
        let args = concat(&self.bound, trailing);
        tracing::trace!(arity = args.len(), "applying bound worker");
        (self.worker)(args).into_future()
    }
}

/// Several workers sharing the same bound arguments
#[derive(Debug, Clone)]
pub struct AppliedEach<K, W, A> {
    workers: TaskCollection<K, W>,
    bound: Vec<A>,
    config: IterConfig,
}

/// Bind leading arguments to every worker; calls run them all at once.
///
/// A single worker goes in as a one-element array, `apply_each([worker],
/// bound)`, and its value comes back as a one-element sequence.
///
/// # Example
/// ```
/// use aplus::{apply_each, Settle};
///
/// # tokio_test::block_on(async {
/// let greet = apply_each([|args: Vec<&str>| Settle::<_, ()>::value(args.join(" "))], ["hi"]);
/// let values = greet.call(vec!["there"]).await.unwrap().into_values();
/// assert_eq!(values, vec!["hi there".to_string()]);
/// # });
/// ```
pub fn apply_each<K, W, A>(
    workers: impl Into<TaskCollection<K, W>>,
    bound: impl IntoIterator<Item = A>,
) -> AppliedEach<K, W, A> {
    AppliedEach {
        workers: workers.into(),
        bound: bound.into_iter().collect(),
        config: IterConfig::parallel().with_label("apply_each"),
    }
}

/// [`apply_each`], running the workers one at a time
pub fn apply_each_series<K, W, A>(
    workers: impl Into<TaskCollection<K, W>>,
    bound: impl IntoIterator<Item = A>,
) -> AppliedEach<K, W, A> {
    AppliedEach {
        workers: workers.into(),
        bound: bound.into_iter().collect(),
        config: IterConfig::series().with_label("apply_each_series"),
    }
}

/// [`apply_each`] with at most `limit` workers outstanding
pub fn apply_each_limit<K, W, A>(
    workers: impl Into<TaskCollection<K, W>>,
    limit: usize,
    bound: impl IntoIterator<Item = A>,
) -> Result<AppliedEach<K, W, A>> {
    Ok(AppliedEach {
        workers: workers.into(),
        bound: bound.into_iter().collect(),
        config: IterConfig::limited(limit)?.with_label("apply_each_limit"),
    })
}

impl<K: Clone, W, A: Clone> AppliedEach<K, W, A> {
    /// Arguments bound so far
    pub fn bound(&self) -> &[A] {
        &self.bound
    }

    /// Run every worker with `bound ++ trailing` and collect their values in
    /// the workers' shape
    pub fn call<'s, T, E>(
        &'s self,
        trailing: Vec<A>,
    ) -> BoxFuture<'s, std::result::Result<Collection<K, T>, E>>
    where
        K: Send,
        W: Fn(Vec<A>) -> Settle<'static, T, E> + Sync,
        A: Send,
        T: Send + 'static,
        E: Send + 'static,
    {
        let args = concat(&self.bound, trailing);
        tracing::trace!(
            arity = args.len(),
            workers = self.workers.len(),
            "applying bound workers"
        );
        BoundedIter::new(self.workers.as_ref(), self.config.clone(), move |worker: &W| {
            worker(args.clone())
        })
        .boxed()
    }
}

fn concat<A: Clone>(bound: &[A], trailing: Vec<A>) -> Vec<A> {
    let mut args = Vec::with_capacity(bound.len() + trailing.len());
    args.extend_from_slice(bound);
    args.extend(trailing);
    args
}
