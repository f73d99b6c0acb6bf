//! Out-of-band transitions delivered to a running super-machine.

use std::fmt;

use crate::compose::SuperMachine;
use crate::context::Context;
use crate::error::{Cancelled, SendError};
use crate::queue::{Queue, Sink, Source};
use crate::state::{Next, StateFn};
use crate::upon::TransitionFuture;

/// Unbuffered channel of hijack targets owned by a [`SuperMachine`].
///
/// A send completes only once the super-machine's current activation has
/// received the target through
/// [`Machine::next_state`](crate::Machine::next_state), at which point that
/// activation returns the target instead of deciding for itself.
pub struct HijackChannel<E, S: ?Sized> {
    source: Source<StateFn<E, S>>,
    sink: Sink<StateFn<E, S>>,
}

impl<E, S: ?Sized> HijackChannel<E, S> {
    pub(crate) fn new() -> Self {
        let queue = Queue::new(0);
        Self {
            source: queue.source(),
            sink: queue.sink(),
        }
    }

    pub(crate) fn source(&self) -> Source<StateFn<E, S>> {
        self.source.clone()
    }

    /// Offers `target` to the super-machine, racing cancellation.
    ///
    /// Completes once the super-machine's running state has accepted it. If
    /// cancellation wins, the offer is withdrawn and the target is returned.
    pub async fn send(
        &self,
        ctx: &Context,
        target: StateFn<E, S>,
    ) -> Result<(), SendError<StateFn<E, S>>> {
        self.sink.send(ctx, target).await
    }
}

impl<E, S: ?Sized> Clone for HijackChannel<E, S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            sink: self.sink.clone(),
        }
    }
}

impl<E, S: ?Sized> fmt::Debug for HijackChannel<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HijackChannel").finish_non_exhaustive()
    }
}

/// Forces `super_machine` to abandon the state it is running through
/// `pending` and adopt `target`.
///
/// `pending` is the in-flight delegated call started with
/// [`upon`](crate::upon) on a masquerade; the hijack makes it resolve.
/// Sends `target` on the super-machine's hijack channel, then waits for
/// `pending`, each step racing cancellation. Returns the state `pending`
/// resolved to, or [`Cancelled`] if cancellation won either race. A context
/// that is already cancelled returns `Err` without offering anything.
///
/// The hijack can only be accepted by a super state that is still waiting
/// on [`Machine::next_state`](crate::Machine::next_state). If `pending`
/// resolves on its own while the offer is outstanding, the offer is
/// withdrawn and that result is returned instead of `target`. A super state
/// that neither resolves nor selects on `next_state` stalls the call until
/// `ctx` is cancelled.
pub async fn try_hijack<E, S: ?Sized>(
    super_machine: &SuperMachine<E, S>,
    ctx: &Context,
    target: StateFn<E, S>,
    mut pending: TransitionFuture<E, S>,
) -> Result<Next<E, S>, Cancelled> {
    let name = target.name();
    let hijack = super_machine.hijack();
    tokio::select! {
        biased;
        _ = ctx.done() => return Err(Cancelled),
        next = &mut pending => return Ok(next),
        // The super-machine owns both ends of its hijack channel, so the
        // only failure left is cancellation.
        sent = hijack.send(ctx, target) => sent.map_err(|_| Cancelled)?,
    }
    super_machine
        .machine()
        .observer()
        .hijack_requested(super_machine.machine().name(), name);

    tokio::select! {
        biased;
        _ = ctx.done() => Err(Cancelled),
        next = pending => Ok(next),
    }
}
