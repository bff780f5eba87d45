//! Stream-ordered resource emulated on host memory.
//!
//! Lets consumers of stream-ordered resources run without a device. Storage
//! comes from the system allocator, but ordering follows the stream-ordered
//! contract: a block freed on stream `s` goes to `s`'s free list and is handed
//! back by the next matching allocation on `s` with no synchronization.
//! Blocks only move between streams, or back to the system, after their
//! stream has been synchronized.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::config::EmulatedConfig;
use super::system::SystemResource;
use crate::diagnostics::{mr_debug, mr_trace, mr_warn};
use crate::mr::error::ResourceError;
use crate::mr::kind::Kind;
use crate::mr::resource::MemoryResourceExt;
use crate::mr::stream_ordered::StreamOrderedMemoryResource;
use crate::stream::{Stream, StreamView};
use crate::sync::atomics::{AtomicCounter, UsageGauge};
use crate::sync::mutex::Mutex;
use crate::util::size::format_bytes;

/// Free-list key: blocks are only reused for an identical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BlockKey {
    stream: StreamView,
    bytes: usize,
    alignment: usize,
}

/// A freed block waiting for reuse.
struct Block(NonNull<u8>);

// SAFETY: a cached block is owned by the free list, not by any thread.
unsafe impl Send for Block {}

#[derive(Default)]
struct FreeLists {
    blocks: HashMap<BlockKey, Vec<Block>>,
    cached_bytes: usize,
}

impl FreeLists {
    fn pop(&mut self, key: &BlockKey) -> Option<Block> {
        let list = self.blocks.get_mut(key)?;
        let block = list.pop()?;
        if list.is_empty() {
            self.blocks.remove(key);
        }
        self.cached_bytes -= key.bytes;
        Some(block)
    }

    fn push(&mut self, key: BlockKey, block: Block) {
        self.blocks.entry(key).or_default().push(block);
        self.cached_bytes += key.bytes;
    }

    fn take_all(&mut self) -> HashMap<BlockKey, Vec<Block>> {
        self.cached_bytes = 0;
        std::mem::take(&mut self.blocks)
    }
}

/// Statistics for an [`EmulatedStreamResource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmulatedStats {
    /// Bytes handed out and not yet deallocated.
    pub live_bytes: usize,
    /// Highest value of `live_bytes`.
    pub peak_bytes: usize,
    /// Bytes deallocated and held for same-stream reuse.
    pub cached_bytes: usize,
    /// Blocks obtained from the system.
    pub allocations: u64,
    /// Allocations served from a stream's free list.
    pub reuses: u64,
    /// Reclamation passes run on exhaustion or on request.
    pub reclaims: u64,
}

/// Stream-ordered resource of kind `K` emulated with host memory.
///
/// Blocks cached for a stream stay cached after the stream is destroyed,
/// until [`release_cached`](Self::release_cached), exhaustion, or drop.
pub struct EmulatedStreamResource<K: Kind> {
    config: EmulatedConfig,
    heap: SystemResource,
    free: Mutex<FreeLists>,
    live: UsageGauge,
    allocations: AtomicCounter,
    reuses: AtomicCounter,
    reclaims: AtomicCounter,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Kind> EmulatedStreamResource<K> {
    /// Create a resource with the given configuration.
    pub fn new(config: EmulatedConfig) -> Self {
        mr_debug!(
            "emulated {} resource: capacity {}, max alignment {}",
            K::KIND,
            format_bytes(config.capacity),
            config.max_alignment
        );
        Self {
            config,
            heap: SystemResource::new(),
            free: Mutex::new(FreeLists::default()),
            live: UsageGauge::new(),
            allocations: AtomicCounter::new(),
            reuses: AtomicCounter::new(),
            reclaims: AtomicCounter::new(),
            _kind: PhantomData,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &EmulatedConfig {
        &self.config
    }

    /// Current statistics.
    pub fn stats(&self) -> EmulatedStats {
        EmulatedStats {
            live_bytes: self.live.get(),
            peak_bytes: self.live.peak(),
            cached_bytes: self.free.lock().cached_bytes,
            allocations: self.allocations.get(),
            reuses: self.reuses.get(),
            reclaims: self.reclaims.get(),
        }
    }

    /// Synchronize every stream holding cached blocks and return those blocks
    /// to the system. Returns the number of bytes released.
    pub fn release_cached(&self) -> usize {
        let blocks = self.free.lock().take_all();
        self.reclaims.increment();

        let mut released = 0;
        for (key, list) in blocks {
            // Work enqueued before the free may still use the blocks.
            key.stream.synchronize_no_throw();
            for Block(ptr) in list {
                // SAFETY: cached blocks came from `heap` with these arguments
                // and their stream has drained.
                unsafe { self.heap.deallocate_aligned(ptr, key.bytes, key.alignment) };
                released += key.bytes;
            }
        }

        mr_debug!("{}: released {} of cached blocks", K::KIND, format_bytes(released));
        released
    }

    /// Reserve `bytes` against capacity. Cached blocks count as used.
    fn reserve(&self, bytes: usize) -> bool {
        let free = self.free.lock();
        let footprint = self.live.get() + free.cached_bytes;
        match footprint.checked_add(bytes) {
            Some(total) if total <= self.config.capacity => {
                self.live.add(bytes);
                true
            }
            _ => false,
        }
    }
}

impl<K: Kind> Default for EmulatedStreamResource<K> {
    fn default() -> Self {
        Self::new(EmulatedConfig::default())
    }
}

impl<K: Kind> std::fmt::Debug for EmulatedStreamResource<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatedStreamResource")
            .field("kind", &K::KIND)
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<K: Kind> StreamOrderedMemoryResource<K> for EmulatedStreamResource<K> {
    type Stream = StreamView;

    fn do_allocate_async(
        &self,
        bytes: usize,
        alignment: usize,
        stream: StreamView,
    ) -> Result<NonNull<u8>, ResourceError> {
        if !alignment.is_power_of_two() || alignment > self.config.max_alignment {
            return Err(ResourceError::unsupported_alignment(bytes, alignment));
        }

        let key = BlockKey {
            stream,
            bytes,
            alignment,
        };
        // Pop and count as live under one guard so `reserve` never sees the
        // block as neither cached nor live.
        let cached = {
            let mut free = self.free.lock();
            let block = free.pop(&key);
            if block.is_some() {
                self.live.add(bytes);
            }
            block
        };
        if let Some(Block(ptr)) = cached {
            self.reuses.increment();
            mr_trace!("{:?}: reused {} bytes at {:p}", stream, bytes, ptr);
            return Ok(ptr);
        }

        if !self.reserve(bytes) {
            if !self.config.reclaim_on_exhaustion {
                return Err(ResourceError::out_of_memory(bytes, alignment));
            }
            mr_warn!(
                "{}: capacity exhausted allocating {}, reclaiming cached blocks",
                K::KIND,
                format_bytes(bytes)
            );
            self.release_cached();
            if !self.reserve(bytes) {
                return Err(ResourceError::out_of_memory(bytes, alignment));
            }
        }

        match self.heap.allocate_aligned(bytes, alignment) {
            Ok(ptr) => {
                self.allocations.increment();
                mr_trace!("{:?}: allocated {} bytes at {:p}", stream, bytes, ptr);
                Ok(ptr)
            }
            Err(err) => {
                self.live.sub(bytes);
                Err(err)
            }
        }
    }

    unsafe fn do_deallocate_async(
        &self,
        ptr: NonNull<u8>,
        bytes: usize,
        alignment: usize,
        stream: StreamView,
    ) {
        let key = BlockKey {
            stream,
            bytes,
            alignment,
        };
        {
            let mut free = self.free.lock();
            free.push(key, Block(ptr));
            self.live.sub(bytes);
        }
        mr_trace!("{:?}: freed {} bytes at {:p}", stream, bytes, ptr);
    }
}

impl<K: Kind> Drop for EmulatedStreamResource<K> {
    fn drop(&mut self) {
        let live = self.live.get();
        if live > 0 {
            mr_warn!("{}: dropped with {} still allocated", K::KIND, format_bytes(live));
        }
        self.release_cached();
    }
}
