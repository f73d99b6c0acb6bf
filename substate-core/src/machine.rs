//! The machine handle state functions run against, its builder, and the
//! spawned driver task.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;

use crate::compose::{SubMachine, SuperMachine};
use crate::config::{Config, OnCancel};
use crate::context::Context;
use crate::error::TaskError;
use crate::hijack::HijackChannel;
use crate::observe::Observer;
use crate::queue::{Queue, Sink, Source};
use crate::state::{self, StateFn};

/// A runnable state machine.
///
/// This is the handle every [`StateFn`] receives. It is cheap to clone and
/// bundles the machine's event [`Source`] and [`Sink`], its state table `S`,
/// its initial state and, for hijackable machines, the surface hijack
/// requests arrive on.
///
/// Which capabilities a handle has is fixed when it is built:
/// [`Builder::build`] yields a plain machine, [`Builder::build_super`] a
/// hijackable [`SuperMachine`], and [`SuperMachine::sub_machine`] a
/// [`SubMachine`].
pub struct Machine<E, S: ?Sized> {
    inner: Arc<Inner<E, S>>,
}

pub(crate) struct Inner<E, S: ?Sized> {
    pub(crate) name: Arc<str>,
    pub(crate) source: Source<E>,
    pub(crate) sink: Sink<E>,
    pub(crate) states: Arc<S>,
    pub(crate) initial: StateFn<E, S>,
    /// Where hijack targets are received; `None` if not hijackable.
    pub(crate) next: Option<Source<StateFn<E, S>>>,
    pub(crate) observer: Arc<dyn Observer>,
    pub(crate) on_cancel: OnCancel,
    pub(crate) role: Role<E, S>,
}

pub(crate) enum Role<E, S: ?Sized> {
    Root,
    Sub(SuperMachine<E, S>),
    Masquerade(SubMachine<E, S>),
}

impl<E, S: ?Sized> Machine<E, S> {
    /// Starts building a machine around the state table `states`.
    pub fn builder(states: Arc<S>) -> Builder<E, S> {
        Builder::new(states)
    }

    pub(crate) fn from_inner(inner: Inner<E, S>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub(crate) fn inner(&self) -> &Inner<E, S> {
        &self.inner
    }

    /// The machine's name, as reported to its observer.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The receive side of this machine's event queue.
    #[must_use]
    pub fn source(&self) -> &Source<E> {
        &self.inner.source
    }

    /// The send side of this machine's event queue.
    #[must_use]
    pub fn sink(&self) -> &Sink<E> {
        &self.inner.sink
    }

    /// The state table successors are looked up in.
    #[must_use]
    pub fn states(&self) -> &Arc<S> {
        &self.inner.states
    }

    /// The state [`run`](crate::run) starts from.
    #[must_use]
    pub fn initial_state(&self) -> StateFn<E, S> {
        self.inner.initial.clone()
    }

    /// Returns `true` if hijack targets can arrive through
    /// [`next_state`](Self::next_state).
    #[must_use]
    pub fn is_hijackable(&self) -> bool {
        self.inner.next.is_some()
    }

    /// Waits for a hijack request.
    ///
    /// State functions of hijackable machines include this in their select
    /// alongside their event source and `ctx.done()`; when it fires, the
    /// activation returns the received state. On a machine that is not
    /// hijackable this never resolves. Cancel-safe.
    pub async fn next_state(&self) -> StateFn<E, S> {
        if let Some(next) = &self.inner.next {
            if let Some(state) = next.recv().await {
                return state;
            }
        }
        std::future::pending().await
    }

    /// Recovers the sub-machine view of this handle.
    ///
    /// Returns `Some` for the handle a sub-machine's states receive, and for
    /// a masquerade of a sub-machine.
    #[must_use]
    pub fn as_sub(&self) -> Option<SubMachine<E, S>> {
        match &self.inner.role {
            Role::Root => None,
            Role::Sub(parent) => Some(SubMachine::from_parts(self.clone(), parent.clone())),
            Role::Masquerade(sub) => Some(sub.clone()),
        }
    }

    /// The observer notified by this machine.
    #[must_use]
    pub fn observer(&self) -> &Arc<dyn Observer> {
        &self.inner.observer
    }

    /// The forwarding policy applied when cancellation interrupts a
    /// dispatch.
    #[must_use]
    pub fn on_cancel(&self) -> OnCancel {
        self.inner.on_cancel
    }
}

impl<E, S> Machine<E, S>
where
    E: Send + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    /// Runs this machine on a new tokio task.
    ///
    /// The returned [`Task`] resolves once the machine reaches a terminal
    /// state. Cancel `ctx` to ask it to wind down.
    pub fn spawn(&self, ctx: Context) -> Task {
        Task {
            handle: tokio::spawn(state::run(ctx, self.clone())),
        }
    }
}

impl<E, S: ?Sized> Clone for Machine<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, S: ?Sized> fmt::Debug for Machine<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.inner.name)
            .field("initial", &self.inner.initial)
            .field("hijackable", &self.is_hijackable())
            .finish_non_exhaustive()
    }
}

/// Builds a root [`Machine`] or [`SuperMachine`].
///
/// ```rust
/// # use std::sync::Arc;
/// # use substate_core::{Machine, StateFn};
/// let done: StateFn<u8, ()> = StateFn::new("done", |_ctx, _m| async { None });
/// let machine = Machine::builder(Arc::new(()))
///     .name("worker")
///     .queue_capacity(8)
///     .build(done);
/// assert_eq!(machine.name(), "worker");
/// assert!(!machine.is_hijackable());
/// ```
pub struct Builder<E, S: ?Sized> {
    config: Config,
    states: Arc<S>,
    _event: PhantomData<fn() -> E>,
}

impl<E, S: ?Sized> Builder<E, S> {
    fn new(states: Arc<S>) -> Self {
        Self {
            config: Config::default(),
            states,
            _event: PhantomData,
        }
    }

    /// Replaces every setting at once.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the name reported to the observer.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Sets the event queue capacity; `0` makes it a rendezvous.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Sets the forwarding policy sub-machines inherit.
    #[must_use]
    pub fn on_cancel(mut self, policy: OnCancel) -> Self {
        self.config.on_cancel = policy;
        self
    }

    /// Installs an observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.config.observer = observer;
        self
    }

    /// Builds a machine that cannot be hijacked.
    pub fn build(self, initial: StateFn<E, S>) -> Machine<E, S> {
        self.assemble(initial, None)
    }

    /// Builds a hijackable machine that sub-machines can extend.
    pub fn build_super(self, initial: StateFn<E, S>) -> SuperMachine<E, S> {
        let hijack = HijackChannel::new();
        let machine = self.assemble(initial, Some(hijack.source()));
        SuperMachine::from_parts(machine, hijack)
    }

    fn assemble(self, initial: StateFn<E, S>, next: Option<Source<StateFn<E, S>>>) -> Machine<E, S> {
        let queue = Queue::new(self.config.queue_capacity);
        Machine::from_inner(Inner {
            name: self.config.name.into(),
            source: queue.source(),
            sink: queue.sink(),
            states: self.states,
            initial,
            next,
            observer: self.config.observer,
            on_cancel: self.config.on_cancel,
            role: Role::Root,
        })
    }
}

/// A machine's driver running on a tokio task.
///
/// Awaiting it waits for the machine to reach a terminal state.
#[derive(Debug)]
pub struct Task {
    handle: tokio::task::JoinHandle<()>,
}

impl Task {
    /// Aborts the driver without waiting for the states to unwind.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Returns `true` once the driver has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for Task {
    type Output = Result<(), TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(())),
            Poll::Ready(Err(e)) => Poll::Ready(Err(TaskError::Join(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}
