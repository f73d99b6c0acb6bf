//! Injected observation hooks for state tracing.
//!
//! The driver, [`dispatch`](crate::SubMachine::dispatch) and
//! [`try_hijack`](crate::try_hijack) report what they do to the machine's
//! [`Observer`]. The default [`TracingObserver`] turns those reports into
//! `tracing` events; tests can install their own to record transitions.

/// Receives notifications about a machine's progress.
///
/// All hooks default to doing nothing.
pub trait Observer: Send + Sync {
    /// The driver is about to invoke `state`.
    fn state_entered(&self, _machine: &str, _state: &str) {}

    /// `state` returned; `next` is `None` when it was terminal.
    fn state_exited(&self, _machine: &str, _state: &str, _next: Option<&str>) {}

    /// A hijack targeting `target` was accepted by `machine`'s hijack
    /// channel.
    fn hijack_requested(&self, _machine: &str, _target: &str) {}

    /// A forwarded event was discarded because the context was cancelled.
    fn event_dropped(&self, _machine: &str) {}

    /// The driver loop for `machine` has returned.
    fn terminated(&self, _machine: &str) {}
}

/// Reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn state_entered(&self, machine: &str, state: &str) {
        tracing::debug!(machine, state, "entering state");
    }

    fn state_exited(&self, machine: &str, state: &str, next: Option<&str>) {
        tracing::trace!(machine, state, next = next.unwrap_or("<terminal>"), "leaving state");
    }

    fn hijack_requested(&self, machine: &str, target: &str) {
        tracing::debug!(machine, target, "hijack accepted");
    }

    fn event_dropped(&self, machine: &str) {
        tracing::warn!(machine, "dropping forwarded event after cancellation");
    }

    fn terminated(&self, machine: &str) {
        tracing::debug!(machine, "machine terminated");
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
