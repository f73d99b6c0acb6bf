//! Broadcast cancellation shared by every blocking operation.

use std::sync::Arc;

use tokio::sync::watch;

/// Cancellation context handed to every state function.
///
/// Cloning is cheap and every clone observes the same signal. Once
/// [`cancel`](Context::cancel) has been called, [`done`](Context::done)
/// resolves immediately for all present and future waiters.
///
/// # Example
///
/// ```rust
/// # use substate_core::Context;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = Context::new();
/// let waiter = ctx.clone();
/// let join = tokio::spawn(async move { waiter.done().await });
///
/// ctx.cancel();
/// join.await.unwrap();
/// assert!(ctx.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    done_tx: Arc<watch::Sender<bool>>,
}

impl Context {
    /// Creates a context that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (done_tx, _) = watch::channel(false);
        Self {
            done_tx: Arc::new(done_tx),
        }
    }

    /// Requests cancellation. Calling this more than once has no further
    /// effect.
    pub fn cancel(&self) {
        self.done_tx.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        });
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.done_tx.borrow()
    }

    /// Resolves once cancellation has been requested.
    ///
    /// This is cancel-safe and intended to be raced in `tokio::select!`
    /// against every other blocking operation.
    pub async fn done(&self) {
        let mut rx = self.done_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_done_pending_until_cancelled() {
        let ctx = Context::new();
        assert!(!ctx.is_cancelled());
        assert!(
            tokio::time::timeout(Duration::from_millis(20), ctx.done())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_cancel_wakes_existing_waiters() {
        let ctx = Context::new();
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let ctx = ctx.clone();
                tokio::spawn(async move { ctx.done().await })
            })
            .collect();

        tokio::task::yield_now().await;
        ctx.cancel();

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should observe cancellation")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let once = Context::new();
        once.cancel();

        let twice = Context::new();
        twice.cancel();
        twice.cancel();

        assert_eq!(once.is_cancelled(), twice.is_cancelled());
        // Late waiters still see the signal.
        tokio::time::timeout(Duration::from_millis(100), twice.done())
            .await
            .expect("done should stay ready");
    }
}
