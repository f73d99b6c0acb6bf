//! Bounded FIFO event queues with a receive-only [`Source`] and a send-only
//! [`Sink`] view.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};

use crate::context::Context;
use crate::error::SendError;

/// What actually travels through the underlying channel.
enum Envelope<E> {
    /// An event owned by a buffered queue.
    Buffered(E),
    /// A rendezvous offer; the sender is still waiting for a consumer.
    Offer(Arc<Offer<E>>),
}

/// A parked rendezvous hand-off. Exactly one of [`Offer::claim`] and
/// [`Offer::withdraw`] obtains the event.
struct Offer<E> {
    slot: Mutex<Option<(E, oneshot::Sender<()>)>>,
}

impl<E> Offer<E> {
    fn new(event: E, ack: oneshot::Sender<()>) -> Self {
        Self {
            slot: Mutex::new(Some((event, ack))),
        }
    }

    fn take(&self) -> Option<(E, oneshot::Sender<()>)> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Consumer side: takes the event and releases the sender.
    fn claim(&self) -> Option<E> {
        self.take().map(|(event, ack)| {
            let _ = ack.send(());
            event
        })
    }

    /// Sender side: takes the event back if no consumer has claimed it yet.
    fn withdraw(&self) -> Option<E> {
        self.take().map(|(event, _)| event)
    }
}

/// Sender-side hold on a parked offer.
struct Parked<E>(Option<Arc<Offer<E>>>);

impl<E> Parked<E> {
    fn withdraw(&mut self) -> Option<E> {
        self.0.take().and_then(|offer| offer.withdraw())
    }

    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl<E> Drop for Parked<E> {
    fn drop(&mut self) {
        drop(self.withdraw());
    }
}

/// A bounded, ordered, multi-producer/single-consumer event queue.
///
/// A capacity of `0` makes the queue a rendezvous: [`Sink::send`] only
/// completes once the consumer has taken the event.
pub struct Queue<E> {
    source: Source<E>,
    sink: Sink<E>,
    capacity: usize,
}

impl<E> Queue<E> {
    /// Creates a queue buffering up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            source: Source {
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            },
            sink: Sink {
                tx,
                rendezvous: capacity == 0,
            },
            capacity,
        }
    }

    /// Receive-only view of this queue.
    #[must_use]
    pub fn source(&self) -> Source<E> {
        self.source.clone()
    }

    /// Send-only view of this queue.
    #[must_use]
    pub fn sink(&self) -> Sink<E> {
        self.sink.clone()
    }

    /// Number of events the queue buffers; `0` for a rendezvous queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<E> fmt::Debug for Queue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Receive-only handle onto a [`Queue`].
///
/// Clones share the same queue. The queue has one logical consumer; clones
/// exist so that a masquerading sub-machine can read its super-machine's
/// source, and concurrent readers are serialised.
pub struct Source<E> {
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Envelope<E>>>>,
}

impl<E> Source<E> {
    /// Waits for the next event.
    ///
    /// Returns `None` once every [`Sink`] is gone. Cancel-safe: if the future
    /// is dropped before completion no event is lost, so it can lose a
    /// `tokio::select!` race without consuming anything.
    pub async fn recv(&self) -> Option<E> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await? {
                Envelope::Buffered(event) => return Some(event),
                Envelope::Offer(offer) => {
                    // A withdrawn offer belongs to a sender that was cancelled.
                    if let Some(event) = offer.claim() {
                        return Some(event);
                    }
                }
            }
        }
    }

    /// Waits for the next event or for cancellation, whichever comes first.
    ///
    /// Cancellation wins ties and yields `None`.
    pub async fn recv_or_done(&self, ctx: &Context) -> Option<E> {
        tokio::select! {
            biased;
            _ = ctx.done() => None,
            event = self.recv() => event,
        }
    }

    /// Takes an already available event without waiting.
    ///
    /// Returns `None` when the queue is empty or another reader currently
    /// holds the source.
    pub fn try_recv(&self) -> Option<E> {
        let mut rx = self.rx.try_lock().ok()?;
        loop {
            match rx.try_recv().ok()? {
                Envelope::Buffered(event) => return Some(event),
                Envelope::Offer(offer) => {
                    if let Some(event) = offer.claim() {
                        return Some(event);
                    }
                }
            }
        }
    }
}

impl<E> Clone for Source<E> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<E> fmt::Debug for Source<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").finish_non_exhaustive()
    }
}

/// Send-only handle onto a [`Queue`]. Any number of producers may hold one.
pub struct Sink<E> {
    tx: mpsc::Sender<Envelope<E>>,
    rendezvous: bool,
}

impl<E> Sink<E> {
    /// Sends an event, waiting for capacity (or, on a rendezvous queue, for
    /// the consumer) while racing cancellation.
    ///
    /// Cancellation wins ties. When it wins, nothing has been delivered and
    /// the event comes back in [`SendError::Cancelled`].
    pub async fn send(&self, ctx: &Context, event: E) -> Result<(), SendError<E>> {
        let permit = tokio::select! {
            biased;
            _ = ctx.done() => return Err(SendError::Cancelled(event)),
            permit = self.tx.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => return Err(SendError::Closed(event)),
            },
        };

        if !self.rendezvous {
            permit.send(Envelope::Buffered(event));
            return Ok(());
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        let offer = Arc::new(Offer::new(event, ack_tx));
        permit.send(Envelope::Offer(Arc::clone(&offer)));
        // Dropping this future before the ack withdraws the offer.
        let mut parked = Parked(Some(offer));

        tokio::select! {
            biased;
            _ = ctx.done() => match parked.withdraw() {
                Some(event) => Err(SendError::Cancelled(event)),
                // The consumer claimed it first.
                None => Ok(()),
            },
            _ = self.tx.closed() => match parked.withdraw() {
                Some(event) => Err(SendError::Closed(event)),
                None => Ok(()),
            },
            _ = ack_rx => {
                parked.disarm();
                Ok(())
            }
        }
    }

    /// Returns `true` if the event source has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<E> Clone for Sink<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rendezvous: self.rendezvous,
        }
    }
}

impl<E> fmt::Debug for Sink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("rendezvous", &self.rendezvous)
            .finish_non_exhaustive()
    }
}
