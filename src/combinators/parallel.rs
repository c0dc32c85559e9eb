//! Parallel, series and limited runs over task collections.
//!
//! Every function here is the bounded iterator with a different cap. The
//! `each*` variants drop the values and only report success or the first
//! failure.

use crate::collection::{Collection, TaskCollection};
use crate::error::Result;
use crate::parallel::{BoundedIter, IterConfig};
use crate::runtime::Settle;
use futures_util::future::{MapOk, TryFutureExt};

/// Run over a collection of zero-argument tasks
pub type Parallel<K, F, T, E> = BoundedIter<'static, K, F, fn(F) -> Settle<'static, T, E>, T, E>;

/// [`Parallel`] with the values discarded
pub type Each<K, F, T, E> = MapOk<Parallel<K, F, T, E>, fn(Collection<K, T>)>;

fn invoke<F, T, E>(task: F) -> Settle<'static, T, E>
where
    F: FnOnce() -> Settle<'static, T, E>,
{
    task()
}

fn discard<K, T>(_: Collection<K, T>) {}

fn run<K, F, T, E>(tasks: TaskCollection<K, F>, config: IterConfig) -> Parallel<K, F, T, E>
where
    F: FnOnce() -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    BoundedIter::new(tasks, config, invoke::<F, T, E> as fn(F) -> Settle<'static, T, E>)
}

/// Start every task at once and collect their values in input shape.
///
/// # Example
/// ```
/// use aplus::{parallel, task, Collection, Settle};
///
/// # tokio_test::block_on(async {
/// let tasks = vec![
///     task(|| Settle::value(1)),
///     task(|| Settle::deferred(async { Ok(2) })),
/// ];
/// let values = parallel(tasks).await;
/// assert_eq!(values, Ok::<_, ()>(Collection::Sequence(vec![1, 2])));
/// # });
/// ```
pub fn parallel<K, F, T, E>(tasks: impl Into<TaskCollection<K, F>>) -> Parallel<K, F, T, E>
where
    F: FnOnce() -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    run(tasks.into(), IterConfig::parallel())
}

/// Run tasks one at a time, each after the previous one succeeded
pub fn series<K, F, T, E>(tasks: impl Into<TaskCollection<K, F>>) -> Parallel<K, F, T, E>
where
    F: FnOnce() -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    run(tasks.into(), IterConfig::series())
}

/// Run tasks with at most `limit` outstanding
pub fn parallel_limit<K, F, T, E>(
    tasks: impl Into<TaskCollection<K, F>>,
    limit: usize,
) -> Result<Parallel<K, F, T, E>>
where
    F: FnOnce() -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    Ok(run(tasks.into(), IterConfig::limited(limit)?))
}

/// [`parallel`] without the values
pub fn each<K, F, T, E>(tasks: impl Into<TaskCollection<K, F>>) -> Each<K, F, T, E>
where
    F: FnOnce() -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    run(tasks.into(), IterConfig::parallel().with_label("each"))
        .map_ok(discard::<K, T> as fn(Collection<K, T>))
}

/// [`series`] without the values
pub fn each_series<K, F, T, E>(tasks: impl Into<TaskCollection<K, F>>) -> Each<K, F, T, E>
where
    F: FnOnce() -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    run(tasks.into(), IterConfig::series().with_label("each_series"))
        .map_ok(discard::<K, T> as fn(Collection<K, T>))
}

/// [`parallel_limit`] without the values
pub fn each_limit<K, F, T, E>(
    tasks: impl Into<TaskCollection<K, F>>,
    limit: usize,
) -> Result<Each<K, F, T, E>>
where
    F: FnOnce() -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let config = IterConfig::limited(limit)?.with_label("each_limit");
    Ok(run(tasks.into(), config).map_ok(discard::<K, T> as fn(Collection<K, T>)))
}
