//! Error types.

/// Failure to deliver an event (or a hijack target) into a queue.
///
/// Cancellation is the only backpressure escape; when it wins the event was
/// never enqueued and, unless the forwarding policy discarded it, is handed
/// back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SendError<E> {
    /// The context was cancelled before the event was delivered.
    #[error("send cancelled before delivery")]
    Cancelled(E),
    /// The receiving side of the queue no longer exists.
    #[error("queue closed")]
    Closed(E),
    /// The context was cancelled and the forwarding policy discarded the
    /// event.
    #[error("event dropped after cancellation")]
    Dropped,
}

impl<E> SendError<E> {
    /// Returns the undelivered event, if the error still carries it.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Cancelled(event) | Self::Closed(event) => Some(event),
            Self::Dropped => None,
        }
    }
}

/// The context was cancelled before the operation could make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("context cancelled")]
pub struct Cancelled;

/// Error type returned by awaiting a spawned machine [`Task`](crate::Task).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The driver task panicked or was aborted.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
