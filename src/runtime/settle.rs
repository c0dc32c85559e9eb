//! Task outcomes and their normalization into futures.
//!
//! A task may finish synchronously, hand back a future, or hand back a
//! foreign [`Thenable`] that reports through a callback. [`Settle`] tags
//! which one it is so the iterator can decide once, at launch, whether it
//! has to wait at all.

use futures_util::future::{self, BoxFuture, FutureExt, TryFutureExt};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Boxed future carrying a task's eventual result
pub type Deferred<'a, T, E> = BoxFuture<'a, std::result::Result<T, E>>;

/// Boxed zero-argument task, for collections mixing different closures
pub type BoxTask<'a, T, E> = Box<dyn FnOnce() -> Settle<'a, T, E> + Send + 'a>;

/// Box a closure as a [`BoxTask`]
pub fn task<'a, T, E, F>(f: F) -> BoxTask<'a, T, E>
where
    F: FnOnce() -> Settle<'a, T, E> + Send + 'a,
{
    Box::new(f)
}

/// What a task produced when it was invoked
pub enum Settle<'a, T, E> {
    /// Already settled; recorded without yielding
    Immediate(std::result::Result<T, E>),
    /// A future that settles later
    Deferred(Deferred<'a, T, E>),
    /// A foreign value that settles by calling back into a [`Resolver`]
    Thenable(Box<dyn Thenable<T, E> + Send + 'a>),
}

impl<'a, T, E> Settle<'a, T, E> {
    /// Successful immediate outcome
    pub fn value(value: T) -> Self {
        Settle::Immediate(Ok(value))
    }

    /// Failed immediate outcome
    pub fn error(error: E) -> Self {
        Settle::Immediate(Err(error))
    }

    /// Wrap a future
    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = std::result::Result<T, E>> + Send + 'a,
    {
        Settle::Deferred(Box::pin(fut))
    }

    /// Wrap a thenable
    pub fn thenable<H>(thenable: H) -> Self
    where
        H: Thenable<T, E> + Send + 'a,
    {
        Settle::Thenable(Box::new(thenable))
    }

    /// True when no waiting is needed
    pub fn is_immediate(&self) -> bool {
        matches!(self, Settle::Immediate(_))
    }

    /// Transform the success value, keeping immediacy
    pub fn map<U, F>(self, f: F) -> Settle<'a, U, E>
    where
        F: FnOnce(T) -> U + Send + 'a,
        T: Send + 'a,
        E: Send + 'a,
    {
        match self {
            Settle::Immediate(result) => Settle::Immediate(result.map(f)),
            other => Settle::Deferred(other.into_future().map_ok(f).boxed()),
        }
    }

    /// Normalize any outcome into a future
    pub fn into_future(self) -> Deferred<'a, T, E>
    where
        T: Send + 'a,
        E: Send + 'a,
    {
        match self {
            Settle::Immediate(result) => future::ready(result).boxed(),
            Settle::Deferred(fut) => fut,
            Settle::Thenable(thenable) => adopt(thenable),
        }
    }
}

impl<'a, T, E> From<std::result::Result<T, E>> for Settle<'a, T, E> {
    fn from(result: std::result::Result<T, E>) -> Self {
        Settle::Immediate(result)
    }
}

impl<'a, T: fmt::Debug, E: fmt::Debug> fmt::Debug for Settle<'a, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Settle::Immediate(result) => f.debug_tuple("Immediate").field(result).finish(),
            Settle::Deferred(_) => f.write_str("Deferred(..)"),
            Settle::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// A value that settles by registering a continuation.
///
/// `then` is called once, right when the outcome is adopted. The
/// implementation may settle the resolver on the spot or hold on to it
/// and settle later from anywhere.
pub trait Thenable<T, E> {
    /// Register the continuation
    fn then(self: Box<Self>, resolver: Resolver<T, E>);
}

impl<T, E, F> Thenable<T, E> for F
where
    F: FnOnce(Resolver<T, E>),
{
    fn then(self: Box<Self>, resolver: Resolver<T, E>) {
        (*self)(resolver)
    }
}

/// Continuation handle given to a [`Thenable`].
///
/// Clones share one slot: the first `resolve`/`reject` wins and every
/// later call is ignored.
pub struct Resolver<T, E> {
    slot: Arc<Mutex<Option<oneshot::Sender<std::result::Result<T, E>>>>>,
}

impl<T, E> Resolver<T, E> {
    fn channel() -> (Self, oneshot::Receiver<std::result::Result<T, E>>) {
        let (tx, rx) = oneshot::channel();
        let resolver = Resolver {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (resolver, rx)
    }

    /// Fulfill with a value
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    /// Fail with an error
    pub fn reject(&self, error: E) {
        self.settle(Err(error));
    }

    /// Settle with a result, returning whether this call was the one that
    /// settled
    pub fn settle(&self, result: std::result::Result<T, E>) -> bool {
        let Some(tx) = self.slot.lock().take() else {
            return false;
        };
        // Receiver gone means the run was abandoned; nobody is listening.
        let _ = tx.send(result);
        true
    }

    /// Whether some clone already settled
    pub fn is_settled(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Resolver {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("settled", &self.is_settled())
            .finish()
    }
}

fn adopt<'a, T, E>(thenable: Box<dyn Thenable<T, E> + Send + 'a>) -> Deferred<'a, T, E>
where
    T: Send + 'a,
    E: Send + 'a,
{
    let (resolver, rx) = Resolver::channel();
    thenable.then(resolver);
    async move {
        match rx.await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("thenable dropped its resolver without settling; task will never complete");
                future::pending().await
            }
        }
    }
    .boxed()
}
