//! The job queue shared by the dispatcher and its workers.
//!
//! Backed by an `async-channel` MPMC channel: every worker holds a receiver
//! clone, and a job delivered to one receiver is never seen by another.
//! Closing the channel wakes all idle workers; they keep receiving until the
//! buffer is drained and only then observe the "no more work" sentinel.
//!
//! Enqueueing never blocks. With a bounded capacity a full queue is reported
//! immediately as [`EnqueueError::Full`] so the HTTP layer can push back.

use async_channel::{Receiver, Sender, TrySendError};

use crate::job::Job;

/// Capacity policy of a [`JobQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueCapacity {
    /// At most `n` pending jobs; further enqueues fail with [`EnqueueError::Full`].
    Bounded(usize),
    /// No limit on pending jobs.
    Unbounded,
}

impl QueueCapacity {
    /// Map a configured size onto a policy: `0` means unbounded.
    pub fn from_config(size: usize) -> Self {
        if size == 0 {
            Self::Unbounded
        } else {
            Self::Bounded(size)
        }
    }
}

impl Default for QueueCapacity {
    fn default() -> Self {
        Self::Bounded(1024)
    }
}

/// Why a job was not accepted by the queue.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("job queue is closed")]
    Closed,

    #[error("job queue is full ({capacity} jobs pending)")]
    Full { capacity: usize },
}

/// FIFO job queue with an explicit, idempotent close.
#[derive(Clone)]
pub struct JobQueue {
    tx: Sender<Job>,
    rx: Receiver<Job>,
    capacity: QueueCapacity,
}

impl JobQueue {
    pub fn new(capacity: QueueCapacity) -> Self {
        let (tx, rx) = match capacity {
            QueueCapacity::Bounded(n) => async_channel::bounded(n.max(1)),
            QueueCapacity::Unbounded => async_channel::unbounded(),
        };
        Self { tx, rx, capacity }
    }

    /// Append `job` without waiting.
    pub fn enqueue(&self, job: Job) -> Result<(), EnqueueError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(EnqueueError::Closed),
            Err(TrySendError::Full(_)) => Err(EnqueueError::Full {
                capacity: self.tx.capacity().unwrap_or_default(),
            }),
        }
    }

    /// Wait for the next job.
    ///
    /// Returns `None` once the queue is closed *and* empty.
    pub async fn dequeue(&self) -> Option<Job> {
        self.rx.recv().await.ok()
    }

    /// Stop accepting jobs. Already-queued jobs stay available to
    /// [`dequeue`](Self::dequeue). Returns `true` only for the call that
    /// actually closed the queue.
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Number of jobs waiting to be claimed.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> QueueCapacity {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
