//! Execution stream interface.
//!
//! Resources only need two things from a stream: a default value and a
//! blocking `synchronize`. Anything else about the stream (how work is
//! scheduled, which device it belongs to) stays with its owner.

use std::error::Error as StdError;
use std::fmt;
use std::hash::Hash;

use crate::diagnostics::mr_error;

/// An ordered queue of operations.
///
/// Operations enqueued on one stream run in enqueue order. Operations on
/// different streams are unordered unless the caller synchronizes.
pub trait Stream: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Error reported by a failed synchronization.
    type Error: StdError + Send + Sync + 'static;

    /// The implicit stream used when a caller names none.
    fn default_stream() -> Self;

    /// Whether this is the default stream.
    fn is_default(&self) -> bool {
        *self == Self::default_stream()
    }

    /// Block until all work enqueued on this stream has completed.
    fn synchronize(&self) -> Result<(), Self::Error>;

    /// Like [`synchronize`](Self::synchronize) but never fails; errors are logged.
    ///
    /// For paths that must not raise, such as deallocation.
    fn synchronize_no_throw(&self) {
        if let Err(err) = self.synchronize() {
            mr_error!("synchronize of {:?} failed: {}", self, err);
        }
    }
}
