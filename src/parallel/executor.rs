//! Bounded iterator for aplus runs
//!
//! Drives a worker over every item of a [`TaskCollection`] with a cap on how
//! many outcomes may be outstanding, and settles exactly once.

use crate::collection::{Collection, Reassembly, TaskCollection};
use crate::parallel::config::IterConfig;
use crate::runtime::Settle;
use futures_util::future::{self, BoxFuture, FusedFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

type Slotted<'a, T, E> = BoxFuture<'a, (usize, std::result::Result<T, E>)>;

/// What happens to outstanding futures once a run has rejected
type Abandon<'a, T, E> = fn(FuturesUnordered<Slotted<'a, T, E>>);

/// Future running every item through a worker with bounded concurrency.
///
/// Resolves with every value in the input's shape, or with the first error
/// that arrives. Arrival order decides which error wins when several tasks
/// fail concurrently.
///
/// After the first error nothing else is launched. Tasks already in flight
/// are not cancelled: a run built with [`BoundedIter::new`] hands them to the
/// current tokio runtime, which drives them to completion and discards their
/// results. A run built with [`BoundedIter::scoped`] holds futures that
/// borrow from the caller, so they cannot outlive it and are dropped instead.
///
/// # Example
/// ```
/// use aplus::{BoundedIter, IterConfig, Settle};
///
/// # tokio_test::block_on(async {
/// let run = BoundedIter::new(
///     vec![1, 2, 3].into(),
///     IterConfig::limited(2)?,
///     |n: i32| Settle::<_, ()>::deferred(async move { Ok(n * 2) }),
/// );
/// let doubled = run.await.unwrap().into_values();
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # Ok::<(), aplus::Error>(())
/// # }).unwrap();
/// ```
pub struct BoundedIter<'a, K, I, W, T, E> {
    pending: VecDeque<(usize, I)>,
    in_flight: FuturesUnordered<Slotted<'a, T, E>>,
    results: Option<Reassembly<K, T>>,
    worker: W,
    limit: usize,
    launched: usize,
    settled: bool,
    label: &'static str,
    abandon: Abandon<'a, T, E>,
}

// Fields are never pinned in place; `poll` only needs `&mut Self`.
impl<'a, K, I, W, T, E> Unpin for BoundedIter<'a, K, I, W, T, E> {}

impl<K, I, W, T, E> BoundedIter<'static, K, I, W, T, E>
where
    W: FnMut(I) -> Settle<'static, T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    /// Prepare a run; nothing is invoked until the first poll.
    ///
    /// If the run rejects, tasks still in flight finish on the current tokio
    /// runtime with their results discarded.
    pub fn new(tasks: TaskCollection<K, I>, config: IterConfig, worker: W) -> Self {
        Self::build(tasks, config, worker, detach::<T, E>)
    }
}

impl<'a, K, I, W, T, E> BoundedIter<'a, K, I, W, T, E>
where
    W: FnMut(I) -> Settle<'a, T, E>,
    T: Send + 'a,
    E: Send + 'a,
{
    /// Prepare a run whose outcomes may borrow from the caller.
    ///
    /// Such futures cannot be handed to a runtime, so if the run rejects the
    /// ones still in flight are dropped at their next await point.
    pub fn scoped(tasks: TaskCollection<K, I>, config: IterConfig, worker: W) -> Self {
        Self::build(tasks, config, worker, discard::<T, E>)
    }

    fn build(
        tasks: TaskCollection<K, I>,
        config: IterConfig,
        worker: W,
        abandon: Abandon<'a, T, E>,
    ) -> Self {
        let limit = config.limit.cap(tasks.len());
        let (pending, results) = tasks.normalize();
        tracing::trace!(
            label = config.label,
            total = pending.len(),
            limit,
            "bounded run created"
        );
        BoundedIter {
            pending,
            in_flight: FuturesUnordered::new(),
            results: Some(results),
            worker,
            limit,
            launched: 0,
            settled: false,
            label: config.label,
            abandon,
        }
    }

    /// Tasks currently outstanding
    pub fn active(&self) -> usize {
        self.in_flight.len()
    }

    /// Tasks not yet started
    pub fn queued(&self) -> usize {
        self.pending.len()
    }

    /// Tasks invoked so far
    pub fn launched(&self) -> usize {
        self.launched
    }

    /// Launch work until the cap is reached or the queue runs dry.
    ///
    /// Immediate outcomes are recorded on the spot, so a run of synchronous
    /// tasks completes without ever yielding. A synchronous failure is
    /// returned for the caller to settle with.
    fn fill(&mut self) -> std::result::Result<(), (usize, E)> {
        while !self.settled && self.in_flight.len() < self.limit {
            let Some((slot, item)) = self.pending.pop_front() else {
                break;
            };
            self.launched += 1;
            match (self.worker)(item) {
                Settle::Immediate(Ok(value)) => {
                    tracing::trace!(label = self.label, slot, "task settled synchronously");
                    self.record(slot, value);
                }
                Settle::Immediate(Err(error)) => return Err((slot, error)),
                outcome => {
                    tracing::trace!(
                        label = self.label,
                        slot,
                        active = self.in_flight.len() + 1,
                        "task launched"
                    );
                    let fut = outcome.into_future().map(move |result| (slot, result));
                    self.in_flight.push(fut.boxed());
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, slot: usize, value: T) {
        if let Some(results) = self.results.as_mut() {
            results.collect(slot, value);
        }
    }

    fn resolve(&mut self) -> std::result::Result<Collection<K, T>, E> {
        self.settled = true;
        tracing::debug!(
            label = self.label,
            launched = self.launched,
            "bounded run resolved"
        );
        match self.results.take() {
            Some(results) => Ok(results.finalize()),
            None => unreachable!("bounded run resolved twice"),
        }
    }

    fn reject(&mut self, slot: usize, error: E) -> std::result::Result<Collection<K, T>, E> {
        self.settled = true;
        tracing::debug!(
            label = self.label,
            slot,
            launched = self.launched,
            abandoned = self.in_flight.len(),
            skipped = self.pending.len(),
            "bounded run rejected"
        );
        self.pending.clear();
        self.results = None;
        if !self.in_flight.is_empty() {
            (self.abandon)(std::mem::take(&mut self.in_flight));
        }
        Err(error)
    }
}

/// Keep abandoned tasks running on the current runtime, ignoring results
fn detach<T, E>(abandoned: FuturesUnordered<Slotted<'static, T, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            tracing::trace!(count = abandoned.len(), "draining abandoned tasks");
            handle.spawn(abandoned.for_each(|_| future::ready(())));
        }
        Err(_) => {
            tracing::warn!(
                count = abandoned.len(),
                "no tokio runtime to finish abandoned tasks; dropping them"
            );
        }
    }
}

fn discard<T, E>(abandoned: FuturesUnordered<Slotted<'_, T, E>>) {
    drop(abandoned);
}

impl<'a, K, I, W, T, E> Future for BoundedIter<'a, K, I, W, T, E>
where
    W: FnMut(I) -> Settle<'a, T, E>,
    T: Send + 'a,
    E: Send + 'a,
{
    type Output = std::result::Result<Collection<K, T>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        assert!(!this.settled, "BoundedIter polled after completion");

        loop {
            if let Err((slot, error)) = this.fill() {
                return Poll::Ready(this.reject(slot, error));
            }
            if this.in_flight.is_empty() {
                // fill() drains the queue whenever there is room, so an empty
                // in-flight set means every slot has been recorded.
                return Poll::Ready(this.resolve());
            }
            match this.in_flight.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some((slot, Ok(value)))) => {
                    tracing::trace!(label = this.label, slot, "task settled");
                    this.record(slot, value);
                }
                Poll::Ready(Some((slot, Err(error)))) => {
                    return Poll::Ready(this.reject(slot, error));
                }
                Poll::Ready(None) => {}
            }
        }
    }
}

impl<'a, K, I, W, T, E> FusedFuture for BoundedIter<'a, K, I, W, T, E>
where
    W: FnMut(I) -> Settle<'a, T, E>,
    T: Send + 'a,
    E: Send + 'a,
{
    fn is_terminated(&self) -> bool {
        self.settled
    }
}

impl<'a, K, I, W, T, E> fmt::Debug for BoundedIter<'a, K, I, W, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedIter")
            .field("label", &self.label)
            .field("limit", &self.limit)
            .field("queued", &self.pending.len())
            .field("active", &self.in_flight.len())
            .field("launched", &self.launched)
            .field("settled", &self.settled)
            .finish()
    }
}
