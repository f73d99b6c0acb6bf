//! Machine configuration.

use std::fmt;
use std::sync::Arc;

use crate::observe::{Observer, TracingObserver};

/// Default event queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// What a sub-machine does with an event it was forwarding upstream when
/// the context is cancelled before the super-machine accepted it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnCancel {
    /// Discard the event, report it through
    /// [`Observer::event_dropped`], and return
    /// [`SendError::Dropped`](crate::SendError::Dropped).
    #[default]
    Drop,
    /// Hand the event back in
    /// [`SendError::Cancelled`](crate::SendError::Cancelled).
    Return,
}

/// Settings shared by [`Builder`](crate::Builder) and
/// [`SubBuilder`](crate::SubBuilder).
#[derive(Clone)]
pub struct Config {
    /// Name used in every observer notification.
    pub name: String,
    /// Event queue capacity; `0` makes the queue a rendezvous.
    pub queue_capacity: usize,
    /// Forwarding policy for sub-machines.
    pub on_cancel: OnCancel,
    /// Observer notified of transitions, hijacks and drops.
    pub observer: Arc<dyn Observer>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "machine".to_owned(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            on_cancel: OnCancel::default(),
            observer: Arc::new(TracingObserver),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("queue_capacity", &self.queue_capacity)
            .field("on_cancel", &self.on_cancel)
            .finish_non_exhaustive()
    }
}
