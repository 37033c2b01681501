//! Pending-operation queue
//!
//! The single hand-off point between submitters and the scheduler: an
//! unbounded FIFO where enqueue never blocks and dequeue supports a bounded
//! wait so the scheduler can close out a partial batch.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::PacerError;
use crate::operation::FetchOperation;

/// Outcome of a bounded-wait dequeue
pub(crate) enum Dequeued {
    /// An operation arrived within the wait window
    Item(FetchOperation),
    /// Nothing arrived before the timeout
    Empty,
    /// Every submitter handle is gone; no more operations will arrive
    Closed,
}

/// Submitter half of the queue
#[derive(Clone)]
pub(crate) struct OperationQueue {
    tx: mpsc::UnboundedSender<FetchOperation>,
}

/// Scheduler half of the queue
pub(crate) struct OperationReceiver {
    rx: mpsc::UnboundedReceiver<FetchOperation>,
}

impl OperationQueue {
    /// Create a fresh queue pair
    pub(crate) fn unbounded() -> (OperationQueue, OperationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (OperationQueue { tx }, OperationReceiver { rx })
    }

    /// Hand an operation to the scheduler
    ///
    /// Never blocks. Fails only when the scheduler side has been torn down,
    /// in which case the operation (and its broker) is dropped.
    pub(crate) fn enqueue(&self, op: FetchOperation) -> Result<(), PacerError> {
        self.tx.send(op).map_err(|_| PacerError::Abandoned)
    }
}

impl OperationReceiver {
    /// Wait up to `wait` for the next operation
    pub(crate) async fn dequeue(&mut self, wait: Duration) -> Dequeued {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(op)) => Dequeued::Item(op),
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::Empty,
        }
    }
}
