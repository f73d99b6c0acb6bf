//! Asynchronous delegation of a single state activation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use tracing::Instrument;

use crate::context::Context;
use crate::machine::Machine;
use crate::state::{Next, StateFn};

/// The eventual result of a state activation started with [`upon`].
///
/// Resolves exactly once. Polling again after it has resolved stays pending
/// forever, so reading it twice hangs rather than producing a second value.
/// Dropping it before it resolves aborts the delegated activation, which
/// keeps an abandoned call from consuming events meant for the next one.
pub struct TransitionFuture<E, S: ?Sized> {
    handle: Option<tokio::task::JoinHandle<Next<E, S>>>,
}

/// Starts `state(ctx, machine)` on its own tokio task and returns the
/// future of its result.
///
/// This is how a sub-state reuses its super-machine's logic: pass a
/// [`masquerade`](crate::SubMachine::masquerade) as `machine`, keep serving
/// the sub-machine's own queue, and select on the returned future.
pub fn upon<E, S>(state: StateFn<E, S>, ctx: Context, machine: Machine<E, S>) -> TransitionFuture<E, S>
where
    E: Send + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    let span = tracing::debug_span!("upon", machine = machine.name(), state = state.name());
    let activation = state.call(ctx, machine).instrument(span);
    TransitionFuture {
        handle: Some(tokio::spawn(activation)),
    }
}

impl<E, S: ?Sized> TransitionFuture<E, S> {
    /// Returns `true` once the result has been read.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.handle.is_none()
    }
}

impl<E, S: ?Sized> Future for TransitionFuture<E, S> {
    type Output = Next<E, S>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let Some(handle) = self.handle.as_mut() else {
            return Poll::Pending;
        };
        match Pin::new(handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                self.handle = None;
                match result {
                    Ok(next) => Poll::Ready(next),
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    // Aborted from outside; nothing was decided.
                    Err(_) => Poll::Ready(None),
                }
            }
        }
    }
}

impl<E, S: ?Sized> Drop for TransitionFuture<E, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl<E, S: ?Sized> fmt::Debug for TransitionFuture<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionFuture")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
