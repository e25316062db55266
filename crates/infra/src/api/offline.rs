//! Offline request queue
//!
//! Requests issued while disconnected wait here until the client comes back
//! online. Each caller holds a [`PendingRequest`] that resolves with the
//! outcome of the replay.

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use super::errors::ApiError;
use super::request::{RequestConfig, ResponseEnvelope};

type Outcome = Result<ResponseEnvelope, ApiError>;

/// A request parked until connectivity returns
#[derive(Debug)]
pub struct QueuedRequest {
    pub config: RequestConfig,
    pub enqueued_at: Instant,
    responder: oneshot::Sender<Outcome>,
}

impl QueuedRequest {
    /// Deliver the replay outcome to the waiting caller
    ///
    /// A caller that stopped waiting is ignored.
    pub fn complete(self, outcome: Outcome) {
        if self.responder.send(outcome).is_err() {
            debug!(url = %self.config.url, "queued request caller went away");
        }
    }
}

/// Caller side of a queued request
#[derive(Debug)]
pub struct PendingRequest {
    receiver: oneshot::Receiver<Outcome>,
}

impl PendingRequest {
    /// Wait for the replay outcome
    ///
    /// Resolves to `Cancelled` if the queue is cleared or dropped first.
    pub async fn wait(self) -> Outcome {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(ApiError::cancelled("queued request dropped before replay")))
    }
}

/// Bounded FIFO of [`QueuedRequest`]s
#[derive(Debug)]
pub struct OfflineQueue {
    capacity: usize,
    queue: Mutex<VecDeque<QueuedRequest>>,
}

impl OfflineQueue {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, queue: Mutex::new(VecDeque::new()) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Park a request
    ///
    /// # Errors
    /// `QueueCapacity` when the queue already holds `capacity` requests.
    pub fn enqueue(&self, config: RequestConfig) -> Result<PendingRequest, ApiError> {
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            return Err(ApiError::queue_capacity(self.capacity));
        }

        let (responder, receiver) = oneshot::channel();
        debug!(url = %config.url, position = queue.len(), "request queued while offline");
        queue.push_back(QueuedRequest { config, enqueued_at: Instant::now(), responder });
        Ok(PendingRequest { receiver })
    }

    /// Take every queued request in enqueue order
    pub fn drain(&self) -> Vec<QueuedRequest> {
        self.queue.lock().drain(..).collect()
    }

    /// Put requests back at the head of the queue, keeping their order
    ///
    /// Used when a flush is interrupted; capacity is not re-checked since
    /// these requests were already accepted.
    pub fn requeue_front(&self, requests: Vec<QueuedRequest>) {
        let mut queue = self.queue.lock();
        for request in requests.into_iter().rev() {
            queue.push_front(request);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Drop every queued request; their callers resolve to `Cancelled`
    pub fn clear(&self) -> usize {
        self.drain().len()
    }
}

/// Result of replaying the offline queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub replayed: usize,
    pub succeeded: usize,
    pub failed: usize,
}
