//! Async Invocation
//!
//! [`Delegate::invoke_async`] hands the whole batch to a blocking worker and
//! returns a [`PendingInvoke`] that can be awaited or waited on.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::runtime_handle;
use crate::delegate::Delegate;
use crate::error::{DelegateError, Result};

/// Completion handle for [`Delegate::invoke_async`].
///
/// Resolves to the last callback's result, [`DelegateError::Cancelled`] if
/// the token fired before dispatch, or [`DelegateError::CallbackPanicked`].
#[must_use = "the invocation runs regardless, but its result is lost if the handle is dropped"]
#[derive(Debug)]
pub struct PendingInvoke<R> {
    rx: oneshot::Receiver<Result<R>>,
}

impl<R> PendingInvoke<R> {
    fn ready(result: Result<R>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }

    /// Block the calling thread until the invocation finishes.
    ///
    /// Panics if called from within an async context; `.await` the handle
    /// there instead.
    pub fn wait(self) -> Result<R> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(DelegateError::WorkerUnavailable))
    }
}

impl<R> Future for PendingInvoke<R> {
    type Output = Result<R>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DelegateError::WorkerUnavailable)))
    }
}

impl<A, R> Delegate<A, R>
where
    A: Clone + Send + 'static,
    R: Default + Send + 'static,
{
    /// Run [`Delegate::invoke`] on a blocking worker.
    ///
    /// The list snapshot is taken when the worker starts, not when this is
    /// called. Once the batch has started, `cancel` is no longer consulted.
    pub fn invoke_async(&self, args: A, cancel: CancellationToken) -> PendingInvoke<R> {
        if cancel.is_cancelled() {
            tracing::warn!("delegate.invoke_async.cancelled");
            return PendingInvoke::ready(Err(DelegateError::Cancelled));
        }

        let (tx, rx) = oneshot::channel();
        let delegate = self.clone();
        runtime_handle().spawn_blocking(move || {
            let _ = tx.send(delegate.run_batch(args, &cancel));
        });

        PendingInvoke { rx }
    }

    /// Body of an async invocation. Must run on a blocking worker.
    pub(super) fn run_batch(&self, args: A, cancel: &CancellationToken) -> Result<R> {
        if cancel.is_cancelled() {
            tracing::warn!("delegate.invoke_async.cancelled");
            return Err(DelegateError::Cancelled);
        }

        let list = self.invocation_list();
        tracing::debug!(callbacks = list.len(), "delegate.invoke_async.start");
        let run = AssertUnwindSafe(|| list.invoke_last(args).unwrap_or_default());
        let result = panic::catch_unwind(run).map_err(|payload| {
            let err = DelegateError::from_panic(payload);
            tracing::warn!(error = %err, "delegate.invoke_async.panicked");
            err
        });
        tracing::debug!(ok = result.is_ok(), "delegate.invoke_async.finish");
        result
    }
}
