//! Host-emulated stream handle.
//!
//! A [`StreamView`] is a cheap copyable id. Work enqueued on it is held in a
//! FIFO and runs when the stream is synchronized, which gives tests and
//! host-only consumers real stream-ordering semantics without a device.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use super::registry::registry;
use super::traits::Stream;
use crate::diagnostics::{mr_debug, mr_trace};

/// Next id handed out by [`StreamView::new`]; 0 is the default stream.
static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Failure of a stream synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// One or more enqueued operations panicked while draining.
    #[error("{failed} operation(s) on stream {stream} failed")]
    OperationFailed {
        /// Stream id.
        stream: u64,
        /// Number of failed operations.
        failed: usize,
    },
}

/// Handle to an emulated execution stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamView {
    id: u64,
}

impl StreamView {
    /// The default stream.
    pub const DEFAULT: StreamView = StreamView { id: 0 };

    /// A fresh stream, distinct from every other stream in the process.
    ///
    /// The stream's queue lives in a process-wide table while it holds work;
    /// it is dropped once a synchronize leaves it empty, or by [`destroy`].
    ///
    /// [`destroy`]: StreamView::destroy
    pub fn new() -> Self {
        let id = NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed);
        mr_trace!("created stream {}", id);
        Self { id }
    }

    /// Numeric id of this stream.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Append `op` to this stream. It runs after everything enqueued before it.
    pub fn enqueue<F>(&self, op: F)
    where
        F: FnOnce() + Send + 'static,
    {
        registry().queue(self.id).push(Box::new(op));
    }

    /// Approximate number of operations not yet run.
    pub fn pending(&self) -> usize {
        registry().existing(self.id).map_or(0, |queue| queue.len())
    }

    /// Whether all enqueued work has run.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Block until every enqueued operation has run.
    pub fn synchronize(&self) -> Result<(), StreamError> {
        let Some(queue) = registry().existing(self.id) else {
            return Ok(());
        };

        let failed = queue.drain();
        registry().prune(self.id, &queue);
        match failed {
            0 => Ok(()),
            failed => {
                mr_debug!("stream {}: {} operation(s) failed", self.id, failed);
                Err(StreamError::OperationFailed {
                    stream: self.id,
                    failed,
                })
            }
        }
    }

    /// Synchronize and release the stream's queue.
    ///
    /// The default stream is never released; it is only synchronized.
    pub fn destroy(self) -> Result<(), StreamError> {
        if self.id == Self::DEFAULT.id {
            return self.synchronize();
        }

        match registry().remove(self.id) {
            Some(queue) => match queue.drain() {
                0 => Ok(()),
                failed => Err(StreamError::OperationFailed {
                    stream: self.id,
                    failed,
                }),
            },
            None => Ok(()),
        }
    }
}

impl fmt::Debug for StreamView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id == 0 {
            write!(f, "StreamView(default)")
        } else {
            write!(f, "StreamView({})", self.id)
        }
    }
}

impl Stream for StreamView {
    type Error = StreamError;

    fn default_stream() -> Self {
        Self::DEFAULT
    }

    fn synchronize(&self) -> Result<(), StreamError> {
        StreamView::synchronize(self)
    }
}
