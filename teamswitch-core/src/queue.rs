//! Bounded FIFO of switches waiting for room on their target faction.
//!
//! Handlers only append; the queue processor is the only reader and the only
//! one that removes, always from the head. A plain mutex is enough since no
//! operation holds it across an await.

use std::sync::{Mutex, MutexGuard};

use arrayvec::ArrayVec;

use crate::models::QueuedSwitch;

pub const MAX_QUEUE_LEN: usize = 10;

#[derive(Default)]
pub struct AdmissionQueue {
    items: Mutex<ArrayVec<QueuedSwitch, MAX_QUEUE_LEN>>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail. Returns false, dropping nothing, when full.
    pub fn try_enqueue(&self, item: QueuedSwitch) -> bool {
        self.lock().try_push(item).is_ok()
    }

    pub fn peek_head(&self) -> Option<QueuedSwitch> {
        self.lock().first().cloned()
    }

    pub fn pop_head(&self) -> Option<QueuedSwitch> {
        self.lock().pop_at(0)
    }

    /// Remove the head only while it is still `expected`.
    pub fn pop_head_if(&self, expected: &QueuedSwitch) -> Option<QueuedSwitch> {
        let mut items = self.lock();
        if items.first() == Some(expected) {
            items.pop_at(0)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().is_full()
    }

    /// Copy of the queue in FIFO order.
    pub fn snapshot(&self) -> Vec<QueuedSwitch> {
        self.lock().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, ArrayVec<QueuedSwitch, MAX_QUEUE_LEN>> {
        // A panic while holding the lock cannot leave the ArrayVec half-written.
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
