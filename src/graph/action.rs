//! Actions - the units of work attached to graph nodes
//!
//! An action receives the resolution's cancellation token and the shared
//! argument. It has no return value: failures are reported through the
//! shared argument or a side channel owned by the caller.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Unit of work executed once its prerequisites have finished
///
/// Cancellation is cooperative. The scheduler never interrupts a running
/// action; long-running bodies should watch `cancel` themselves.
#[async_trait]
pub trait Action<T>: Send + Sync {
    async fn run(&self, cancel: CancellationToken, arg: Arc<T>);
}

/// Wrapper turning an async closure into an [`Action`]
pub struct FnAction<F> {
    func: F,
}

impl<F> FnAction<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<T, F, Fut> Action<T> for FnAction<F>
where
    T: Send + Sync + 'static,
    F: Fn(CancellationToken, Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn run(&self, cancel: CancellationToken, arg: Arc<T>) {
        (self.func)(cancel, arg).await
    }
}

/// Action that does nothing; handy as a placeholder node
pub struct NoopAction;

#[async_trait]
impl<T: Send + Sync + 'static> Action<T> for NoopAction {
    async fn run(&self, _cancel: CancellationToken, _arg: Arc<T>) {}
}
