//! Begin/End Invocation
//!
//! [`Delegate::begin_invoke`] starts a batch on a blocking worker and returns
//! an [`AsyncResult`] carrying caller state. The worker fills the result and
//! then runs the completion callback; [`Delegate::end_invoke`] blocks until
//! the result is there.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

use super::runtime_handle;
use crate::delegate::Delegate;
use crate::error::{DelegateError, Result};

enum Slot<R> {
    Pending,
    Ready(Result<R>),
    Taken,
}

struct Completion<R, S> {
    slot: Mutex<Slot<R>>,
    ready: Condvar,
    state: S,
}

/// Handle returned by [`Delegate::begin_invoke`].
///
/// Cloning shares the same completion. The result can be taken exactly once,
/// through [`Delegate::end_invoke`] or [`AsyncResult::wait`].
pub struct AsyncResult<R, S = ()> {
    inner: Arc<Completion<R, S>>,
}

impl<R, S> AsyncResult<R, S> {
    fn new(state: S) -> Self {
        Self {
            inner: Arc::new(Completion {
                slot: Mutex::new(Slot::Pending),
                ready: Condvar::new(),
                state,
            }),
        }
    }

    fn complete(&self, result: Result<R>) {
        *self.inner.slot.lock() = Slot::Ready(result);
        self.inner.ready.notify_all();
    }

    /// Caller state passed to `begin_invoke`.
    pub fn state(&self) -> &S {
        &self.inner.state
    }

    /// Whether the invocation has finished.
    pub fn is_completed(&self) -> bool {
        !matches!(*self.inner.slot.lock(), Slot::Pending)
    }

    /// Block until the invocation finishes and take its result.
    ///
    /// A second call, from any clone, returns
    /// [`DelegateError::ResultConsumed`].
    pub fn wait(&self) -> Result<R> {
        let mut slot = self.inner.slot.lock();
        loop {
            match std::mem::replace(&mut *slot, Slot::Taken) {
                Slot::Ready(result) => return result,
                Slot::Taken => return Err(DelegateError::ResultConsumed),
                Slot::Pending => {
                    *slot = Slot::Pending;
                    self.inner.ready.wait(&mut slot);
                }
            }
        }
    }
}

impl<R, S> Clone for AsyncResult<R, S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<R, S: fmt::Debug> fmt::Debug for AsyncResult<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("completed", &self.is_completed())
            .field("state", &self.inner.state)
            .finish()
    }
}

impl<A, R> Delegate<A, R>
where
    A: Clone + Send + 'static,
    R: Default + Send + 'static,
{
    /// Start an asynchronous invocation.
    ///
    /// `on_complete` runs on the same blocking worker once the result is
    /// available; `state` travels with the returned handle. The worker never
    /// needs the caller's thread, so `end_invoke` may block on any thread,
    /// including one driving a current-thread runtime.
    pub fn begin_invoke<S, C>(&self, args: A, on_complete: C, state: S) -> AsyncResult<R, S>
    where
        S: Send + Sync + 'static,
        C: FnOnce(&AsyncResult<R, S>) + Send + 'static,
    {
        let handle = AsyncResult::new(state);
        let completion = handle.clone();
        let delegate = self.clone();

        runtime_handle().spawn_blocking(move || {
            completion.complete(delegate.run_batch(args, &CancellationToken::new()));
            on_complete(&completion);
        });

        handle
    }

    /// Wait for an invocation started with [`Delegate::begin_invoke`] and
    /// take its result.
    pub fn end_invoke<S>(&self, result: &AsyncResult<R, S>) -> Result<R> {
        result.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::Callback;
    use std::sync::mpsc;

    #[test]
    fn begin_end_round_trip() {
        let d = Delegate::<(i32, i32), i32>::from_fn(|a: i32, b: i32| a + b);
        d.add(Callback::new(|a: i32, b: i32| a * b));

        let (tx, rx) = mpsc::channel();
        let handle = d.begin_invoke(
            (6, 7),
            move |done: &AsyncResult<i32, &'static str>| {
                let _ = tx.send((*done.state(), done.is_completed()));
            },
            "tag",
        );

        assert_eq!(*handle.state(), "tag");
        assert_eq!(d.end_invoke(&handle), Ok(42));
        assert_eq!(rx.recv().unwrap(), ("tag", true));
    }

    #[test]
    fn result_can_only_be_taken_once() {
        let d = Delegate::<(), u8>::from_fn(|| 3_u8);
        let handle = d.begin_invoke((), |_: &AsyncResult<u8>| {}, ());

        assert_eq!(handle.wait(), Ok(3));
        assert_eq!(d.end_invoke(&handle), Err(DelegateError::ResultConsumed));
    }

    #[test]
    fn completion_callback_can_take_the_result() {
        let d = Delegate::<(), u8>::from_fn(|| 9_u8);
        let (tx, rx) = mpsc::channel();

        let handle = d.begin_invoke(
            (),
            move |done: &AsyncResult<u8>| {
                let _ = tx.send(done.wait());
            },
            (),
        );

        assert_eq!(rx.recv().unwrap(), Ok(9));
        assert!(handle.is_completed());
        assert_eq!(handle.wait(), Err(DelegateError::ResultConsumed));
    }

    #[tokio::test]
    async fn end_invoke_inside_current_thread_runtime() {
        let d = Delegate::<(u8,), u8>::from_fn(|x: u8| x + 1);
        let handle = d.begin_invoke((4,), |_: &AsyncResult<u8>| {}, ());

        assert_eq!(d.end_invoke(&handle), Ok(5));
    }

    #[test]
    fn panics_surface_through_end_invoke() {
        let d = Delegate::<(), u8>::from_fn(|| -> u8 { panic!("begin exploded") });
        let (tx, rx) = mpsc::channel();

        let handle = d.begin_invoke(
            (),
            move |done: &AsyncResult<u8>| {
                let _ = tx.send(done.is_completed());
            },
            (),
        );

        assert_eq!(
            d.end_invoke(&handle),
            Err(DelegateError::CallbackPanicked { message: "begin exploded".into() })
        );
        assert!(rx.recv().unwrap());
    }
}
