//! Integration tests for parallel, series and limited runs
//!
//! These tests drive whole runs on a tokio runtime and check ordering,
//! shape, concurrency caps and fail-fast behavior.

use aplus::{
    each, each_limit, each_series, map_with, parallel, parallel_limit, series, task, BoxTask,
    Collection, IterConfig, OrderedMap, Resolver, Settle, TaskCollection,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Error with identity, so tests can check the exact value comes back
#[derive(Debug)]
struct Failure(String);

type Shared = Arc<Failure>;

fn failure(message: &str) -> Shared {
    Arc::new(Failure(message.to_string()))
}

fn resolving(value: i32) -> BoxTask<'static, i32, Shared> {
    task(move || Settle::deferred(async move { Ok(value) }))
}

fn returning(value: i32) -> BoxTask<'static, i32, Shared> {
    task(move || Settle::value(value))
}

fn thenable(value: i32) -> BoxTask<'static, i32, Shared> {
    task(move || Settle::thenable(move |r: Resolver<i32, Shared>| r.resolve(value)))
}

fn rejecting(error: &Shared) -> BoxTask<'static, i32, Shared> {
    let error = Arc::clone(error);
    task(move || Settle::deferred(async move { Err(error) }))
}

fn sleeping(ms: u64, value: i32) -> BoxTask<'static, i32, Shared> {
    task(move || {
        Settle::deferred(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(value)
        })
    })
}

/// Tracks how many tasks are running at once
#[derive(Default)]
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl Gauge {
    fn task(self: &Arc<Self>, value: i32, yields: usize) -> BoxTask<'static, i32, Shared> {
        let gauge = Arc::clone(self);
        task(move || {
            gauge.started.fetch_add(1, Ordering::SeqCst);
            let now = gauge.active.fetch_add(1, Ordering::SeqCst) + 1;
            gauge.peak.fetch_max(now, Ordering::SeqCst);
            Settle::deferred(async move {
                for _ in 0..yields {
                    tokio::task::yield_now().await;
                }
                gauge.active.fetch_sub(1, Ordering::SeqCst);
                Ok(value)
            })
        })
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Sequence input
// =============================================================================

#[tokio::test]
async fn test_parallel_array_of_deferred() {
    let tasks: Vec<_> = [1, 2, 4, 3, 5].into_iter().map(resolving).collect();
    let values = parallel(tasks).await.unwrap();
    assert_eq!(values, Collection::Sequence(vec![1, 2, 4, 3, 5]));
}

#[tokio::test]
async fn test_parallel_array_of_values() {
    let tasks: Vec<_> = [1, 2, 4, 3, 5].into_iter().map(returning).collect();
    let values = parallel(tasks).await.unwrap();
    assert_eq!(values, Collection::Sequence(vec![1, 2, 4, 3, 5]));
}

#[tokio::test]
async fn test_parallel_limit_array_of_thenables() {
    let tasks: Vec<_> = [1, 2, 4, 3, 5].into_iter().map(thenable).collect();
    let values = parallel_limit(tasks, 2).unwrap().await.unwrap();
    assert_eq!(values, Collection::Sequence(vec![1, 2, 4, 3, 5]));
}

#[tokio::test]
async fn test_outcome_kinds_normalize_identically() {
    let plain = parallel(vec![task(|| Settle::<_, ()>::value("x"))]).await;
    let deferred = parallel(vec![task(|| Settle::<_, ()>::deferred(async { Ok("x") }))]).await;
    let foreign = parallel(vec![task(|| {
        Settle::<_, ()>::thenable(|r: Resolver<&'static str, ()>| r.resolve("x"))
    })])
    .await;

    let expected = Ok(Collection::Sequence(vec!["x"]));
    assert_eq!(plain, expected);
    assert_eq!(deferred, expected);
    assert_eq!(foreign, expected);
}

#[tokio::test]
async fn test_results_follow_input_not_completion() {
    let tasks: Vec<_> = [5, 4, 3, 2, 1]
        .into_iter()
        .map(|v| sleeping(v as u64 * 5, v))
        .collect();
    let values = parallel_limit(tasks, 2).unwrap().await.unwrap();
    assert_eq!(values.into_sequence(), Some(vec![5, 4, 3, 2, 1]));

    // Later tasks finish first when everything starts together.
    let tasks: Vec<_> = [1, 2, 3].into_iter().map(|v| sleeping(30 - v as u64 * 10, v)).collect();
    let values = parallel(tasks).await.unwrap();
    assert_eq!(values.into_sequence(), Some(vec![1, 2, 3]));
}

// =============================================================================
// Keyed input
// =============================================================================

#[tokio::test]
async fn test_parallel_map_of_deferred() {
    let tasks = TaskCollection::keyed([("one", resolving(1)), ("two", resolving(2))]).unwrap();
    let values = parallel(tasks).await.unwrap();
    assert_eq!(
        serde_json::to_value(&values).unwrap(),
        json!({"one": 1, "two": 2})
    );
}

#[tokio::test]
async fn test_parallel_limit_map_of_values_and_thenables() {
    let mut tasks = HashMap::new();
    tasks.insert("one".to_string(), returning(1));
    tasks.insert("two".to_string(), thenable(2));
    tasks.insert("three".to_string(), sleeping(5, 3));

    let values = parallel_limit(tasks, 2)
        .unwrap()
        .await
        .unwrap()
        .into_keyed()
        .unwrap();

    assert_eq!(values.len(), 3);
    assert_eq!(values.get("one"), Some(&1));
    assert_eq!(values.get("two"), Some(&2));
    assert_eq!(values.get("three"), Some(&3));
}

#[tokio::test]
async fn test_keyed_result_keeps_insertion_order() {
    let tasks = TaskCollection::keyed([
        ("slow", sleeping(20, 1)),
        ("fast", sleeping(1, 2)),
        ("now", returning(3)),
    ])
    .unwrap();
    let values = series(tasks).await.unwrap().into_keyed().unwrap();
    let keys: Vec<_> = values.keys().copied().collect();
    assert_eq!(keys, vec!["slow", "fast", "now"]);
}

#[tokio::test]
async fn test_empty_inputs_keep_shape() {
    let values = parallel(Vec::<BoxTask<'static, i32, Shared>>::new()).await.unwrap();
    assert_eq!(values, Collection::Sequence(vec![]));
    assert_eq!(serde_json::to_value(&values).unwrap(), json!([]));

    let values = parallel(OrderedMap::<String, BoxTask<'static, i32, Shared>>::new())
        .await
        .unwrap();
    assert_eq!(values, Collection::Keyed(OrderedMap::new()));
    assert_eq!(serde_json::to_value(&values).unwrap(), json!({}));
}

// =============================================================================
// Failure
// =============================================================================

#[tokio::test]
async fn test_rejects_with_original_error() {
    let expected = failure("i am error");
    let tasks = vec![resolving(1), rejecting(&expected), resolving(1)];
    let err = parallel_limit(tasks, 2).unwrap().await.unwrap_err();
    assert!(Arc::ptr_eq(&err, &expected));
}

#[tokio::test]
async fn test_map_rejects_with_original_error() {
    let expected = failure("keyed");
    let tasks =
        TaskCollection::keyed([("one", resolving(1)), ("two", rejecting(&expected))]).unwrap();
    let err = parallel(tasks).await.unwrap_err();
    assert!(Arc::ptr_eq(&err, &expected));
}

#[tokio::test]
async fn test_synchronous_failure_rejects() {
    let expected = failure("thrown");
    let thrown = Arc::clone(&expected);
    let tasks = vec![returning(1), task(move || Settle::error(thrown))];
    let err = series(tasks).await.unwrap_err();
    assert!(Arc::ptr_eq(&err, &expected));
}

#[tokio::test]
async fn test_no_launches_after_rejection() {
    let started = Arc::new(AtomicUsize::new(0));
    let boom = failure("foo");
    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let started = Arc::clone(&started);
            let boom = Arc::clone(&boom);
            task(move || {
                started.fetch_add(1, Ordering::SeqCst);
                Settle::deferred(async move {
                    if i == 1 {
                        Err(boom)
                    } else {
                        tokio::task::yield_now().await;
                        Ok(i)
                    }
                })
            })
        })
        .collect();

    let err = parallel_limit(tasks, 2).unwrap().await.unwrap_err();
    assert!(Arc::ptr_eq(&err, &boom));
    assert!(started.load(Ordering::SeqCst) < 6);
}

#[tokio::test]
async fn test_concurrent_failures_reject_once_with_a_submitted_error() {
    let errors: Vec<_> = (0..4).map(|i| failure(&format!("e{}", i))).collect();
    let tasks: Vec<_> = errors.iter().map(rejecting).collect();
    let err = parallel(tasks).await.unwrap_err();
    // Which one wins is arrival order; only membership is guaranteed.
    assert!(errors.iter().any(|e| Arc::ptr_eq(e, &err)));
}

#[tokio::test]
async fn test_late_success_after_rejection_is_ignored() {
    let (late_tx, late_rx) = tokio::sync::oneshot::channel::<i32>();
    let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<i32>();
    let expected = failure("first");
    let tasks = vec![
        task(move || {
            Settle::deferred(async move {
                let value = late_rx.await.map_err(|_| failure("dropped"));
                if let Ok(v) = value {
                    let _ = seen_tx.send(v);
                }
                value
            })
        }),
        rejecting(&expected),
    ];

    let mut run = parallel(tasks);
    let err = (&mut run).await.unwrap_err();
    assert!(Arc::ptr_eq(&err, &expected));
    assert!(futures_util::future::FusedFuture::is_terminated(&run));

    // The abandoned task keeps running; its value reaches it but not the run.
    assert!(late_tx.send(7).is_ok());
    assert_eq!(seen_rx.await, Ok(7));
}

#[tokio::test]
async fn test_in_flight_tasks_run_to_completion_after_rejection() {
    let finished = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&finished);
    let boom = failure("boom");
    let tasks = vec![
        task(move || {
            Settle::deferred(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
        }),
        rejecting(&boom),
    ];

    let err = parallel_limit(tasks, 2).unwrap().await.unwrap_err();
    assert!(Arc::ptr_eq(&err, &boom));
    assert_eq!(finished.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Concurrency cap
// =============================================================================

#[tokio::test]
async fn test_limit_caps_active_tasks() {
    for limit in 1..=4 {
        let gauge = Arc::new(Gauge::default());
        let tasks: Vec<_> = (0..10).map(|i| gauge.task(i, (i % 3 + 1) as usize)).collect();
        let values = parallel_limit(tasks, limit).unwrap().await.unwrap();
        assert_eq!(values.into_sequence(), Some((0..10).collect::<Vec<_>>()));
        assert!(gauge.peak() <= limit, "peak {} > limit {}", gauge.peak(), limit);
        assert_eq!(gauge.started(), 10);
    }
}

#[tokio::test]
async fn test_series_runs_one_at_a_time() {
    let gauge = Arc::new(Gauge::default());
    let tasks: Vec<_> = (0..5).map(|i| gauge.task(i, 2)).collect();
    series(tasks).await.unwrap();
    assert_eq!(gauge.peak(), 1);
}

#[tokio::test]
async fn test_parallel_starts_everything() {
    let gauge = Arc::new(Gauge::default());
    let tasks: Vec<_> = (0..5).map(|i| gauge.task(i, 3)).collect();
    parallel(tasks).await.unwrap();
    assert_eq!(gauge.peak(), 5);
}

// =============================================================================
// each*
// =============================================================================

#[tokio::test]
async fn test_each_family_discards_values() {
    let gauge = Arc::new(Gauge::default());

    let tasks: Vec<_> = (0..3).map(|i| gauge.task(i, 1)).collect();
    assert!(each(tasks).await.is_ok());

    let tasks: Vec<_> = (0..3).map(|i| gauge.task(i, 1)).collect();
    assert!(each_series(tasks).await.is_ok());

    let tasks: Vec<_> = (0..3).map(|i| gauge.task(i, 1)).collect();
    assert!(each_limit(tasks, 2).unwrap().await.is_ok());

    assert_eq!(gauge.started(), 9);
}

#[tokio::test]
async fn test_each_propagates_error() {
    let expected = failure("each");
    let err = each_series(vec![returning(1), rejecting(&expected), returning(3)])
        .await
        .unwrap_err();
    assert!(Arc::ptr_eq(&err, &expected));
}

#[tokio::test]
async fn test_runs_can_be_spawned() {
    let tasks: Vec<_> = (0..4).map(|v| sleeping(2, v)).collect();
    let handle = tokio::spawn(parallel_limit(tasks, 2).unwrap());
    let values = handle.await.unwrap().unwrap();
    assert_eq!(values.into_values(), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_per_cpu_run_stays_within_cpu_count() {
    let gauge = Arc::new(Gauge::default());
    let tasks: Vec<_> = (0..32).map(|i| gauge.task(i, 2)).collect();
    let values = map_with(tasks, IterConfig::per_cpu(), |run: BoxTask<'static, i32, Shared>| run())
        .await
        .unwrap();
    assert_eq!(values.len(), 32);
    assert!(gauge.peak() <= num_cpus::get());
}
