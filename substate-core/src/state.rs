//! State functions and the driver loop.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::machine::Machine;

/// Boxed, sendable future returned by a state function.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The outcome of one state activation: the next state, or `None` to stop
/// the machine.
pub type Next<E, S> = Option<StateFn<E, S>>;

/// Behavior for one logical state.
///
/// A state function receives the cancellation [`Context`] and a handle to
/// the [`Machine`] it runs on, waits on whatever it needs (its event source,
/// its hijack surface, `ctx.done()`), and returns the next state. Returning
/// `None` terminates the machine.
///
/// `E` is the machine's event type and `S` its state table, usually a trait
/// object listing the machine's states. State functions look up successors
/// through [`Machine::states`] so that sub-machines can substitute their own.
///
/// Two state functions are equal when their names are equal; the body is
/// not compared. A name must therefore identify one body across every state
/// table a machine and its sub-machines use. The `#[state]` attribute names
/// a state after its function, which keeps names unique within a module.
///
/// # Example
///
/// ```rust
/// # use std::future::Future;
/// # use substate_core::{Context, Machine, Next, StateFn};
/// fn idle(ctx: Context, m: Machine<u32, ()>) -> impl Future<Output = Next<u32, ()>> + Send {
///     async move {
///         match m.source().recv_or_done(&ctx).await {
///             Some(_) => Some(StateFn::new("idle", idle)),
///             None => None,
///         }
///     }
/// }
///
/// let state = StateFn::new("idle", idle);
/// assert_eq!(state.name(), "idle");
/// ```
pub struct StateFn<E, S: ?Sized> {
    name: &'static str,
    #[allow(clippy::type_complexity)]
    body: Arc<dyn Fn(Context, Machine<E, S>) -> BoxFuture<'static, Next<E, S>> + Send + Sync>,
}

impl<E: 'static, S: ?Sized + 'static> StateFn<E, S> {
    /// Wraps an async function (or closure returning a future) as a named
    /// state.
    pub fn new<F, Fut>(name: &'static str, f: F) -> Self
    where
        F: Fn(Context, Machine<E, S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Next<E, S>> + Send + 'static,
    {
        Self {
            name,
            body: Arc::new(move |ctx, machine| Box::pin(f(ctx, machine))),
        }
    }
}

impl<E, S: ?Sized> StateFn<E, S> {
    /// The state's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs one activation of this state.
    pub fn call(&self, ctx: Context, machine: Machine<E, S>) -> BoxFuture<'static, Next<E, S>> {
        (self.body)(ctx, machine)
    }
}

impl<E, S: ?Sized> Clone for StateFn<E, S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            body: Arc::clone(&self.body),
        }
    }
}

impl<E, S: ?Sized> PartialEq for StateFn<E, S> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<E, S: ?Sized> Eq for StateFn<E, S> {}

impl<E, S: ?Sized> fmt::Debug for StateFn<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateFn").field(&self.name).finish()
    }
}

/// Maps a state function's return type to the state function type itself.
///
/// Used by the `#[state]` attribute to name the generated constructor's
/// return type from the annotated function's signature.
pub trait Transition {
    /// The state function type this outcome refers to.
    type State;
}

impl<E, S: ?Sized> Transition for Next<E, S> {
    type State = StateFn<E, S>;
}

/// Drives `machine` until a state returns `None`.
///
/// Fetches [`Machine::initial_state`] once, then repeatedly invokes the
/// current state and replaces it with the result. The driver does not watch
/// `ctx` itself; state functions are expected to observe `ctx.done()` at
/// every blocking point and unwind to a terminal state.
pub async fn run<E, S: ?Sized>(ctx: Context, machine: Machine<E, S>) {
    let observer = Arc::clone(machine.observer());
    let mut current = Some(machine.initial_state());

    while let Some(state) = current {
        observer.state_entered(machine.name(), state.name());
        current = state.call(ctx.clone(), machine.clone()).await;
        observer.state_exited(machine.name(), state.name(), current.as_ref().map(StateFn::name));
    }

    observer.terminated(machine.name());
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    type Counter = Machine<(), AtomicUsize>;

    fn countdown() -> StateFn<(), AtomicUsize> {
        StateFn::new("countdown", |_ctx, m: Counter| async move {
            let left = m.states().fetch_sub(1, Ordering::SeqCst);
            if left > 1 { Some(countdown()) } else { None }
        })
    }

    #[test]
    fn test_equality_ignores_body() {
        let stop: StateFn<(), AtomicUsize> = StateFn::new("countdown", |_ctx, _m| async { None });
        assert_eq!(stop, countdown());
    }

    #[test]
    fn test_equality_is_by_name() {
        let a = countdown();
        let b = countdown();
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), "StateFn(\"countdown\")");

        let other: StateFn<(), AtomicUsize> = StateFn::new("other", |_ctx, _m| async { None });
        assert_ne!(a, other);
    }

    #[tokio::test]
    async fn test_run_follows_self_loop_to_terminal() {
        let machine = Machine::builder(Arc::new(AtomicUsize::new(5))).build(countdown());

        tokio::time::timeout(Duration::from_secs(1), run(Context::new(), machine.clone()))
            .await
            .expect("run should reach the terminal state");
        assert_eq!(machine.states().load(Ordering::SeqCst), 0);
    }
}
