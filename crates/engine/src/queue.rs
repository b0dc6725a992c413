//! Bounded FIFO work queue between submission and workers.

use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvError, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};

/// Queue error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("work queue is closed")]
    Closed,
}

/// Bounded multi-producer, multi-consumer FIFO.
///
/// - `push` blocks while the queue is full (backpressure, never a drop)
/// - `pop` blocks while the queue is empty
/// - after `close`, new pushes fail but queued items still drain; `pop`
///   returns `None` once the queue is closed and empty
pub struct WorkQueue<T> {
    sender: Mutex<Option<SyncSender<T>>>,
    receiver: Mutex<Receiver<T>>,
    // Delivered minus popped. Can dip below zero while a consumer outruns
    // the producer's increment; never exceeds what the channel holds.
    depth: AtomicIsize,
    pending_pushes: AtomicUsize,
    capacity: usize,
}

impl<T> std::fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue")
            .field("capacity", &self.capacity)
            .field("depth", &self.depth())
            .field("pending_pushes", &self.pending_pushes())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> WorkQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::sync_channel(capacity);
        Self {
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(rx),
            depth: AtomicIsize::new(0),
            pending_pushes: AtomicUsize::new(0),
            capacity,
        }
    }

    pub fn arc(capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(capacity))
    }

    /// Reserve a producer slot.
    ///
    /// A granted [`Producer`] can still deliver after `close`, so callers
    /// that do work between "may I push?" and "push" never strand an item.
    pub fn producer(&self) -> Result<Producer<'_, T>, QueueError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .cloned()
            .ok_or(QueueError::Closed)?;
        Ok(Producer {
            queue: self,
            sender,
        })
    }

    /// Push an item, blocking while the queue is full.
    pub fn push(&self, item: T) -> Result<(), QueueError> {
        self.producer()?.push(item)
    }

    /// Pop the next item, blocking while the queue is empty.
    ///
    /// Returns `None` once the queue is closed and fully drained.
    pub fn pop(&self) -> Option<T> {
        // The receiver lock is held across the blocking recv: consumers take
        // turns, which keeps dequeue order FIFO across all of them.
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        match receiver.recv() {
            Ok(item) => {
                self.depth.fetch_sub(1, Ordering::AcqRel);
                Some(item)
            }
            Err(RecvError) => None,
        }
    }

    /// Stop accepting new items. Idempotent.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Items sitting in the queue. Never exceeds `capacity`.
    pub fn depth(&self) -> usize {
        let depth = self.depth.load(Ordering::Acquire).max(0) as usize;
        depth.min(self.capacity)
    }

    /// Pushes in progress, including producers blocked on a full queue.
    pub fn pending_pushes(&self) -> usize {
        self.pending_pushes.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A reserved producer slot, see [`WorkQueue::producer`].
pub struct Producer<'a, T> {
    queue: &'a WorkQueue<T>,
    sender: SyncSender<T>,
}

impl<T> Producer<'_, T> {
    /// Deliver the item, blocking while the queue is full.
    pub fn push(self, item: T) -> Result<(), QueueError> {
        self.queue.pending_pushes.fetch_add(1, Ordering::AcqRel);
        let sent = self.sender.send(item);
        self.queue.pending_pushes.fetch_sub(1, Ordering::AcqRel);

        sent.map_err(|_| QueueError::Closed)?;
        self.queue.depth.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
