//! Worker-driven runs: apply one async function to every item.

use crate::collection::TaskCollection;
use crate::error::Result;
use crate::parallel::{BoundedIter, IterConfig};
use crate::runtime::Settle;

/// Apply `worker` to every item with a custom configuration.
///
/// Outcomes that borrow from the caller need [`BoundedIter::scoped`]
/// instead.
pub fn map_with<K, I, W, T, E>(
    items: impl Into<TaskCollection<K, I>>,
    config: IterConfig,
    worker: W,
) -> BoundedIter<'static, K, I, W, T, E>
where
    W: FnMut(I) -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    BoundedIter::new(items.into(), config, worker)
}

/// Apply `worker` to every item at once
pub fn map<K, I, W, T, E>(
    items: impl Into<TaskCollection<K, I>>,
    worker: W,
) -> BoundedIter<'static, K, I, W, T, E>
where
    W: FnMut(I) -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    map_with(items, IterConfig::parallel().with_label("map"), worker)
}

/// Apply `worker` to one item at a time
pub fn map_series<K, I, W, T, E>(
    items: impl Into<TaskCollection<K, I>>,
    worker: W,
) -> BoundedIter<'static, K, I, W, T, E>
where
    W: FnMut(I) -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    map_with(items, IterConfig::series().with_label("map_series"), worker)
}

/// Apply `worker` with at most `limit` items outstanding
pub fn map_limit<K, I, W, T, E>(
    items: impl Into<TaskCollection<K, I>>,
    limit: usize,
    worker: W,
) -> Result<BoundedIter<'static, K, I, W, T, E>>
where
    W: FnMut(I) -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    let config = IterConfig::limited(limit)?.with_label("map_limit");
    Ok(map_with(items, config, worker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use std::collections::BTreeMap;
    use std::time::Duration;

    #[tokio::test]
    async fn test_map_keyed_items() {
        let mut urls = BTreeMap::new();
        urls.insert("b", 20u64);
        urls.insert("a", 10u64);

        let lengths = map(urls, |delay: u64| {
            Settle::<_, ()>::deferred(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(delay / 10)
            })
        })
        .await
        .unwrap();

        let map = lengths.into_keyed().unwrap();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("b"), Some(&2));
    }

    #[tokio::test]
    async fn test_map_series_visits_in_order() {
        let mut seen = Vec::new();
        let result = map_series(vec![3, 1, 2], |n: i32| {
            seen.push(n);
            Settle::<_, ()>::value(n + 1)
        })
        .await;
        assert_eq!(result, Ok(Collection::Sequence(vec![4, 2, 3])));
        assert_eq!(seen, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_map_limit_propagates_error() {
        let result = map_limit(vec![1, 2, 3], 2, |n: i32| {
            Settle::deferred(async move {
                if n == 3 {
                    Err(format!("no {}", n))
                } else {
                    Ok(n)
                }
            })
        })
        .unwrap()
        .await;
        assert_eq!(result, Err("no 3".to_string()));
    }
}
