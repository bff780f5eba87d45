//! Errors raised by allocation entry points.
//!
//! Deallocation never reports errors; only the allocate paths (synchronous and
//! stream-ordered) return these.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed backend error carried by [`ResourceError::InvalidState`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure of an allocation request.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The requested size/alignment/stream combination could not be satisfied.
    #[error("cannot allocate {bytes} bytes aligned to {alignment}: {reason}")]
    Allocation {
        /// Requested size in bytes.
        bytes: usize,
        /// Requested alignment.
        alignment: usize,
        /// Backend explanation.
        reason: AllocFailure,
    },

    /// The backend detected an invalid state, e.g. a failed stream synchronization.
    #[error("resource in invalid state: {0}")]
    InvalidState(#[source] BoxError),
}

/// Why an allocation could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocFailure {
    /// Resource exhausted, even after any backend-internal reclamation.
    #[error("out of memory")]
    OutOfMemory,
    /// The backend does not support the requested alignment.
    #[error("unsupported alignment")]
    UnsupportedAlignment,
    /// The size overflows the backend's addressable range.
    #[error("size overflow")]
    SizeOverflow,
}

impl ResourceError {
    /// Out-of-memory failure for a request.
    pub fn out_of_memory(bytes: usize, alignment: usize) -> Self {
        ResourceError::Allocation {
            bytes,
            alignment,
            reason: AllocFailure::OutOfMemory,
        }
    }

    /// Unsupported-alignment failure for a request.
    pub fn unsupported_alignment(bytes: usize, alignment: usize) -> Self {
        ResourceError::Allocation {
            bytes,
            alignment,
            reason: AllocFailure::UnsupportedAlignment,
        }
    }

    /// Size-overflow failure for a request.
    pub fn size_overflow(bytes: usize, alignment: usize) -> Self {
        ResourceError::Allocation {
            bytes,
            alignment,
            reason: AllocFailure::SizeOverflow,
        }
    }

    /// Wrap a backend error as an invalid-state failure.
    pub fn invalid_state<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        ResourceError::InvalidState(err.into())
    }

    /// Whether this is an allocation failure (as opposed to invalid state).
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, ResourceError::Allocation { .. })
    }
}
