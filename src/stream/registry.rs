//! Process-wide queues backing [`StreamView`](super::StreamView).

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use crossbeam_queue::SegQueue;

use crate::sync::mutex::Mutex;

/// Unit of work enqueued on a stream.
pub(crate) type Operation = Box<dyn FnOnce() + Send + 'static>;

/// FIFO of pending operations for one stream.
pub(crate) struct StreamQueue {
    ops: SegQueue<Operation>,
    /// Held while draining so concurrent synchronizers keep FIFO order.
    drain: Mutex<()>,
}

impl StreamQueue {
    fn new() -> Self {
        Self {
            ops: SegQueue::new(),
            drain: Mutex::new(()),
        }
    }

    /// Append an operation.
    pub fn push(&self, op: Operation) {
        self.ops.push(op);
    }

    /// Run every queued operation in order, including ones appended while
    /// draining. Returns the number of operations that panicked.
    ///
    /// An operation must not synchronize its own stream.
    pub fn drain(&self) -> usize {
        let _guard = self.drain.lock();
        let mut failed = 0;
        while let Some(op) = self.ops.pop() {
            if panic::catch_unwind(AssertUnwindSafe(op)).is_err() {
                failed += 1;
            }
        }
        failed
    }

    /// Approximate number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Map from stream id to its queue.
pub(crate) struct StreamRegistry {
    queues: Mutex<HashMap<u64, Arc<StreamQueue>>>,
}

impl StreamRegistry {
    fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Queue for `id`, created on first use.
    pub fn queue(&self, id: u64) -> Arc<StreamQueue> {
        let mut queues = self.queues.lock();
        Arc::clone(queues.entry(id).or_insert_with(|| Arc::new(StreamQueue::new())))
    }

    /// Queue for `id` if one was ever created.
    pub fn existing(&self, id: u64) -> Option<Arc<StreamQueue>> {
        self.queues.lock().get(&id).cloned()
    }

    /// Forget `queue` if it is still the one registered for `id`, is empty,
    /// and nobody else holds it. Returns whether it was removed.
    pub fn prune(&self, id: u64, queue: &Arc<StreamQueue>) -> bool {
        let mut queues = self.queues.lock();
        let idle = match queues.get(&id) {
            // Handles are only cloned under this lock: two owners are the map
            // and the caller.
            Some(current) => {
                Arc::ptr_eq(current, queue) && Arc::strong_count(queue) == 2 && queue.ops.is_empty()
            }
            None => false,
        };
        if idle {
            queues.remove(&id);
        }
        idle
    }

    /// Forget the queue for `id`. Returns the queue so the caller can drain
    /// anything appended concurrently.
    pub fn remove(&self, id: u64) -> Option<Arc<StreamQueue>> {
        self.queues.lock().remove(&id)
    }
}

/// The global registry.
pub(crate) fn registry() -> &'static StreamRegistry {
    static REGISTRY: OnceLock<StreamRegistry> = OnceLock::new();
    REGISTRY.get_or_init(StreamRegistry::new)
}
