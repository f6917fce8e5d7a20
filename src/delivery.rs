use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Create the bounded output queue shared by a driver and its consumer.
pub(crate) fn bounded<T>(name: String, capacity: usize) -> (Outbox<T>, Deliveries<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Outbox { name, tx }, Deliveries { rx, capacity })
}

/// Producer side of the output queue. Owned by the driver alone.
#[derive(Debug)]
pub(crate) struct Outbox<T> {
    name: String,
    tx: mpsc::Sender<T>,
}

impl<T> Outbox<T> {
    /// Enqueue without waiting. Returns `false` when the payload was
    /// discarded because the queue is full or the consumer is gone.
    pub(crate) fn try_push(&self, payload: T) -> bool {
        match self.tx.try_send(payload) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::debug!("Output of timer '{}' full, dropping payload", self.name);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Output of timer '{}' closed, dropping payload", self.name);
                false
            }
        }
    }
}

/// Consumer side of a [`MultiTimer`](crate::MultiTimer).
///
/// Payloads arrive in deadline order, equal deadlines in the order they were
/// scheduled. Anything that becomes due while `capacity` payloads are already
/// waiting here is lost, so read promptly.
///
/// Also usable as a [`Stream`], which ends once the driver has shut down
/// and every delivered payload has been read.
#[derive(Debug)]
pub struct Deliveries<T> {
    rx: mpsc::Receiver<T>,
    capacity: usize,
}

impl<T> Deliveries<T> {
    /// Receive the next delivered payload.
    ///
    /// Returns `None` once the driver has stopped and the queue is drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Try to receive a delivered payload (non-blocking)
    pub fn try_recv(&mut self) -> Result<T, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Number of payloads currently waiting to be read.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum number of payloads held before new ones are dropped.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Stream for Deliveries<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn test_try_push_drops_when_full() {
        let (outbox, mut deliveries) = bounded("test".to_string(), 2);

        assert!(outbox.try_push(1));
        assert!(outbox.try_push(2));
        assert!(!outbox.try_push(3));
        assert_eq!(deliveries.len(), 2);

        assert_eq!(deliveries.try_recv(), Ok(1));
        assert!(outbox.try_push(4));
        assert_eq!(deliveries.try_recv(), Ok(2));
        assert_eq!(deliveries.try_recv(), Ok(4));
        assert_eq!(
            deliveries.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        );
    }

    #[test]
    fn test_try_push_after_consumer_dropped() {
        let (outbox, deliveries) = bounded::<u8>("test".to_string(), 1);
        drop(deliveries);
        assert!(!outbox.try_push(1));
    }

    #[test]
    fn test_recv_pending_until_pushed() {
        let (outbox, mut deliveries) = bounded("test".to_string(), 1);

        let mut recv = task::spawn(deliveries.recv());
        assert_pending!(recv.poll());

        assert!(outbox.try_push("ready"));
        assert!(recv.is_woken());
        assert_ready_eq!(recv.poll(), Some("ready"));
    }

    #[tokio::test]
    async fn test_stream_ends_when_outbox_dropped() {
        let (outbox, deliveries) = bounded("test".to_string(), 4);
        assert_eq!(deliveries.capacity(), 4);

        for payload in 0..3 {
            assert!(outbox.try_push(payload));
        }
        drop(outbox);

        let collected: Vec<_> = deliveries.collect().await;
        assert_eq!(collected, vec![0, 1, 2]);
    }
}
