//! Ordered filtering with async predicates.
//!
//! The predicate runs once per item through the bounded iterator; items keep
//! their original relative order in the output.

use crate::collection::TaskCollection;
use crate::error::Result;
use crate::parallel::{BoundedIter, IterConfig};
use crate::runtime::Settle;
use futures_util::future::TryFutureExt;
use std::future::Future;

fn sift<'p, I, P, E>(
    items: Vec<I>,
    config: IterConfig,
    mut predicate: P,
    keep: bool,
) -> impl Future<Output = std::result::Result<Vec<I>, E>> + 'p
where
    I: Send + 'static,
    P: FnMut(&I) -> Settle<'static, bool, E> + 'p,
    E: Send + 'static,
{
    let verdicts = BoundedIter::new(TaskCollection::from(items), config, move |item: I| {
        let verdict = predicate(&item);
        verdict.map(move |verdict| (item, verdict))
    });
    verdicts.map_ok(move |verdicts| {
        verdicts
            .into_values()
            .into_iter()
            .filter_map(|(item, verdict)| (verdict == keep).then_some(item))
            .collect()
    })
}

/// Keep items whose predicate resolves `true`, checking all at once
pub fn filter<'p, I, P, E>(
    items: impl IntoIterator<Item = I>,
    predicate: P,
) -> impl Future<Output = std::result::Result<Vec<I>, E>> + 'p
where
    I: Send + 'static,
    P: FnMut(&I) -> Settle<'static, bool, E> + 'p,
    E: Send + 'static,
{
    let config = IterConfig::parallel().with_label("filter");
    sift(items.into_iter().collect(), config, predicate, true)
}

/// [`filter`], one predicate at a time
pub fn filter_series<'p, I, P, E>(
    items: impl IntoIterator<Item = I>,
    predicate: P,
) -> impl Future<Output = std::result::Result<Vec<I>, E>> + 'p
where
    I: Send + 'static,
    P: FnMut(&I) -> Settle<'static, bool, E> + 'p,
    E: Send + 'static,
{
    let config = IterConfig::series().with_label("filter_series");
    sift(items.into_iter().collect(), config, predicate, true)
}

/// [`filter`] with at most `limit` predicates outstanding
pub fn filter_limit<'p, I, P, E>(
    items: impl IntoIterator<Item = I>,
    limit: usize,
    predicate: P,
) -> Result<impl Future<Output = std::result::Result<Vec<I>, E>> + 'p>
where
    I: Send + 'static,
    P: FnMut(&I) -> Settle<'static, bool, E> + 'p,
    E: Send + 'static,
{
    let config = IterConfig::limited(limit)?.with_label("filter_limit");
    Ok(sift(items.into_iter().collect(), config, predicate, true))
}

/// Drop items whose predicate resolves `true`, checking all at once
pub fn reject<'p, I, P, E>(
    items: impl IntoIterator<Item = I>,
    predicate: P,
) -> impl Future<Output = std::result::Result<Vec<I>, E>> + 'p
where
    I: Send + 'static,
    P: FnMut(&I) -> Settle<'static, bool, E> + 'p,
    E: Send + 'static,
{
    let config = IterConfig::parallel().with_label("reject");
    sift(items.into_iter().collect(), config, predicate, false)
}

/// [`reject`], one predicate at a time
pub fn reject_series<'p, I, P, E>(
    items: impl IntoIterator<Item = I>,
    predicate: P,
) -> impl Future<Output = std::result::Result<Vec<I>, E>> + 'p
where
    I: Send + 'static,
    P: FnMut(&I) -> Settle<'static, bool, E> + 'p,
    E: Send + 'static,
{
    let config = IterConfig::series().with_label("reject_series");
    sift(items.into_iter().collect(), config, predicate, false)
}

/// [`reject`] with at most `limit` predicates outstanding
pub fn reject_limit<'p, I, P, E>(
    items: impl IntoIterator<Item = I>,
    limit: usize,
    predicate: P,
) -> Result<impl Future<Output = std::result::Result<Vec<I>, E>> + 'p>
where
    I: Send + 'static,
    P: FnMut(&I) -> Settle<'static, bool, E> + 'p,
    E: Send + 'static,
{
    let config = IterConfig::limited(limit)?.with_label("reject_limit");
    Ok(sift(items.into_iter().collect(), config, predicate, false))
}
