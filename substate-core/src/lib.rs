//! Core runtime types for substate.
//!
//! Machines are driven by state functions: async functions that wait on the
//! machine's event [`Source`], its hijack surface and the cancellation
//! [`Context`], then return the next state. A [`SubMachine`] extends a
//! [`SuperMachine`] by running its own states in front of it, delegating to
//! the super-machine's states through a masquerade, and preempting them
//! with [`try_hijack`].

mod compose;
mod config;
mod context;
mod error;
mod hijack;
mod machine;
mod observe;
mod queue;
mod state;
mod upon;

pub use crate::compose::{SubBuilder, SubMachine, SuperMachine};
pub use crate::config::{Config, DEFAULT_QUEUE_CAPACITY, OnCancel};
pub use crate::context::Context;
pub use crate::error::{Cancelled, SendError, TaskError};
pub use crate::hijack::{HijackChannel, try_hijack};
pub use crate::machine::{Builder, Machine, Task};
pub use crate::observe::{NoopObserver, Observer, TracingObserver};
pub use crate::queue::{Queue, Sink, Source};
pub use crate::state::{BoxFuture, Next, StateFn, Transition, run};
pub use crate::upon::{TransitionFuture, upon};
