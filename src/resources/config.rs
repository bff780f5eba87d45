//! Configuration for the emulated stream-ordered resource.

use crate::util::size::{kb, mb};

/// Configuration for [`EmulatedStreamResource`](super::EmulatedStreamResource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatedConfig {
    /// Bytes the resource may hold at once, live and cached (default: 256 MB)
    pub capacity: usize,

    /// Largest supported alignment (default: 4 KB)
    pub max_alignment: usize,

    /// Release cached blocks before failing an allocation (default: true)
    pub reclaim_on_exhaustion: bool,
}

impl Default for EmulatedConfig {
    fn default() -> Self {
        Self {
            capacity: mb(256),
            max_alignment: kb(4),
            reclaim_on_exhaustion: true,
        }
    }
}

impl EmulatedConfig {
    /// Create a minimal config for tests or constrained environments.
    pub fn minimal() -> Self {
        Self {
            capacity: mb(1),
            max_alignment: 256,
            reclaim_on_exhaustion: true,
        }
    }

    /// Builder pattern: set capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder pattern: set the largest supported alignment.
    pub fn with_max_alignment(mut self, alignment: usize) -> Self {
        self.max_alignment = alignment;
        self
    }

    /// Builder pattern: enable or disable reclamation on exhaustion.
    pub fn with_reclaim_on_exhaustion(mut self, enable: bool) -> Self {
        self.reclaim_on_exhaustion = enable;
        self
    }
}
