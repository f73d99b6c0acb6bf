//! Layering a sub-machine in front of a super-machine.
//!
//! A [`SuperMachine`] is a hijackable machine. It can spawn any number of
//! [`SubMachine`]s, each with its own event queue, optionally its own initial
//! state and state table. A sub-machine's states typically:
//!
//! 1. start the super-machine's version of the state on a
//!    [`masquerade`](SubMachine::masquerade) with [`upon`](crate::upon),
//! 2. serve their own queue, reacting locally and forwarding events upstream
//!    with [`dispatch`](SubMachine::dispatch),
//! 3. adopt whatever the delegated state decides, or preempt it with
//!    [`try_hijack`](crate::try_hijack).

use std::fmt;
use std::sync::Arc;

use crate::config::OnCancel;
use crate::context::Context;
use crate::error::SendError;
use crate::hijack::HijackChannel;
use crate::machine::{Inner, Machine, Role, Task};
use crate::observe::Observer;
use crate::queue::Queue;
use crate::state::StateFn;

/// A machine that exposes a hijack channel and can be extended by
/// sub-machines.
pub struct SuperMachine<E, S: ?Sized> {
    machine: Machine<E, S>,
    hijack: HijackChannel<E, S>,
}

impl<E, S: ?Sized> SuperMachine<E, S> {
    pub(crate) fn from_parts(machine: Machine<E, S>, hijack: HijackChannel<E, S>) -> Self {
        Self { machine, hijack }
    }

    /// The machine handle, as passed to this machine's own states.
    #[must_use]
    pub fn machine(&self) -> &Machine<E, S> {
        &self.machine
    }

    /// The channel hijack requests are sent on.
    #[must_use]
    pub fn hijack(&self) -> &HijackChannel<E, S> {
        &self.hijack
    }

    /// The super-machine's own state table.
    #[must_use]
    pub fn states(&self) -> &Arc<S> {
        self.machine.states()
    }

    /// The super-machine's initial state.
    #[must_use]
    pub fn initial_state(&self) -> StateFn<E, S> {
        self.machine.initial_state()
    }

    /// Builds a sub-machine with a queue of `queue_len` events and, if
    /// given, its own initial state. It shares this machine's state table,
    /// observer and forwarding policy; use [`sub_builder`](Self::sub_builder)
    /// to override them.
    pub fn sub_machine(&self, queue_len: usize, initial: Option<StateFn<E, S>>) -> SubMachine<E, S> {
        let builder = self.sub_builder().queue_capacity(queue_len);
        let builder = match initial {
            Some(initial) => builder.initial(initial),
            None => builder,
        };
        builder.build()
    }

    /// Starts building a sub-machine bound to this machine.
    pub fn sub_builder(&self) -> SubBuilder<E, S> {
        SubBuilder::new(self.clone())
    }
}

impl<E, S> SuperMachine<E, S>
where
    E: Send + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    /// Runs the super-machine itself on a new tokio task.
    pub fn spawn(&self, ctx: Context) -> Task {
        self.machine.spawn(ctx)
    }
}

impl<E, S: ?Sized> Clone for SuperMachine<E, S> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            hijack: self.hijack.clone(),
        }
    }
}

impl<E, S: ?Sized> fmt::Debug for SuperMachine<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperMachine")
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}

/// Configures a [`SubMachine`] before it is bound to its super-machine.
pub struct SubBuilder<E, S: ?Sized> {
    parent: SuperMachine<E, S>,
    name: String,
    queue_capacity: usize,
    initial: Option<StateFn<E, S>>,
    states: Option<Arc<S>>,
    on_cancel: OnCancel,
    observer: Arc<dyn Observer>,
}

impl<E, S: ?Sized> SubBuilder<E, S> {
    fn new(parent: SuperMachine<E, S>) -> Self {
        let machine = parent.machine();
        Self {
            name: format!("{}/sub", machine.name()),
            queue_capacity: crate::config::DEFAULT_QUEUE_CAPACITY,
            initial: None,
            states: None,
            on_cancel: machine.on_cancel(),
            observer: Arc::clone(machine.observer()),
            parent,
        }
    }

    /// Sets the name reported to the observer.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the sub-machine's own queue capacity; `0` makes it a rendezvous.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Overrides the initial state. Without this the sub-machine starts
    /// where its super-machine does.
    #[must_use]
    pub fn initial(mut self, initial: StateFn<E, S>) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Overrides the state table. Without this the sub-machine shares its
    /// super-machine's.
    #[must_use]
    pub fn states(mut self, states: Arc<S>) -> Self {
        self.states = Some(states);
        self
    }

    /// Sets the forwarding policy used by [`SubMachine::dispatch`].
    #[must_use]
    pub fn on_cancel(mut self, policy: OnCancel) -> Self {
        self.on_cancel = policy;
        self
    }

    /// Installs an observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Binds the sub-machine to its super-machine.
    pub fn build(self) -> SubMachine<E, S> {
        let queue = Queue::new(self.queue_capacity);
        let initial = self
            .initial
            .unwrap_or_else(|| self.parent.initial_state());
        let states = self
            .states
            .unwrap_or_else(|| Arc::clone(self.parent.states()));

        let machine = Machine::from_inner(Inner {
            name: self.name.into(),
            source: queue.source(),
            sink: queue.sink(),
            states,
            initial,
            next: None,
            observer: self.observer,
            on_cancel: self.on_cancel,
            role: Role::Sub(self.parent.clone()),
        });
        SubMachine::from_parts(machine, self.parent)
    }
}

/// A machine layered on top of a [`SuperMachine`].
///
/// It has its own event queue and drives its own states; those states
/// delegate to the super-machine's states through a
/// [`masquerade`](Self::masquerade). A sub-machine is not itself
/// hijackable.
pub struct SubMachine<E, S: ?Sized> {
    machine: Machine<E, S>,
    parent: SuperMachine<E, S>,
}

impl<E, S: ?Sized> SubMachine<E, S> {
    pub(crate) fn from_parts(machine: Machine<E, S>, parent: SuperMachine<E, S>) -> Self {
        Self { machine, parent }
    }

    /// The sub-machine's own handle.
    #[must_use]
    pub fn machine(&self) -> &Machine<E, S> {
        &self.machine
    }

    /// The super-machine this sub-machine extends.
    #[must_use]
    pub fn super_machine(&self) -> &SuperMachine<E, S> {
        &self.parent
    }

    /// Forwards `event` into the super-machine's queue, racing cancellation.
    ///
    /// If cancellation wins, the configured [`OnCancel`] policy decides
    /// whether the event is dropped ([`SendError::Dropped`]) or handed back
    /// ([`SendError::Cancelled`]).
    pub async fn dispatch(&self, ctx: &Context, event: E) -> Result<(), SendError<E>> {
        match self.parent.machine().sink().send(ctx, event).await {
            Err(SendError::Cancelled(event)) => match self.machine.on_cancel() {
                OnCancel::Return => Err(SendError::Cancelled(event)),
                OnCancel::Drop => {
                    drop(event);
                    self.machine.observer().event_dropped(self.machine.name());
                    Err(SendError::Dropped)
                }
            },
            other => other,
        }
    }

    /// Returns a stand-in for the super-machine to pass to the
    /// super-machine's own states.
    ///
    /// The facade reads events from the super-machine's queue and receives
    /// the super-machine's hijack requests, so a super state runs on it
    /// exactly as it would on the super-machine. Its state table, sink and
    /// initial state remain the sub-machine's: when the super state looks up
    /// its successor through [`Machine::states`], it gets the sub-machine's
    /// version.
    #[must_use]
    pub fn masquerade(&self) -> Machine<E, S> {
        let sub = self.machine.inner();
        let upstream = self.parent.machine();
        Machine::from_inner(Inner {
            name: Arc::clone(&sub.name),
            source: upstream.source().clone(),
            sink: sub.sink.clone(),
            states: Arc::clone(&sub.states),
            initial: sub.initial.clone(),
            next: Some(self.parent.hijack().source()),
            observer: Arc::clone(&sub.observer),
            on_cancel: sub.on_cancel,
            role: Role::Masquerade(self.clone()),
        })
    }
}

impl<E, S> SubMachine<E, S>
where
    E: Send + 'static,
    S: ?Sized + Send + Sync + 'static,
{
    /// Runs the sub-machine on a new tokio task.
    pub fn spawn(&self, ctx: Context) -> Task {
        self.machine.spawn(ctx)
    }
}

impl<E, S: ?Sized> Clone for SubMachine<E, S> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            parent: self.parent.clone(),
        }
    }
}

impl<E, S: ?Sized> fmt::Debug for SubMachine<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubMachine")
            .field("machine", &self.machine)
            .field("super", &self.parent.machine().name())
            .finish()
    }
}
