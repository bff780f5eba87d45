//! Host resource over the system allocator.

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

use crate::mr::error::ResourceError;
use crate::mr::kind::Host;
use crate::mr::resource::MemoryResource;
use crate::sync::atomics::{AtomicCounter, UsageGauge};

/// [`MemoryResource`] for host memory backed by the global system allocator.
///
/// Any power-of-two alignment is supported. Zero-byte requests get a
/// one-byte block so the result is never dangling.
#[derive(Debug, Default)]
pub struct SystemResource {
    /// Bytes currently allocated, with high-water mark.
    allocated: UsageGauge,

    /// Total successful allocations.
    allocation_count: AtomicCounter,
}

impl SystemResource {
    /// Create a new system resource.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently allocated through this resource.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.get()
    }

    /// Highest value of [`allocated_bytes`](Self::allocated_bytes).
    pub fn peak_bytes(&self) -> usize {
        self.allocated.peak()
    }

    /// Total successful allocations.
    pub fn allocation_count(&self) -> u64 {
        self.allocation_count.get()
    }

    fn layout(bytes: usize, alignment: usize) -> Result<Layout, ResourceError> {
        if !alignment.is_power_of_two() {
            return Err(ResourceError::unsupported_alignment(bytes, alignment));
        }
        Layout::from_size_align(bytes.max(1), alignment)
            .map_err(|_| ResourceError::size_overflow(bytes, alignment))
    }
}

impl MemoryResource<Host> for SystemResource {
    fn do_allocate(&self, bytes: usize, alignment: usize) -> Result<NonNull<u8>, ResourceError> {
        let layout = Self::layout(bytes, alignment)?;

        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| ResourceError::out_of_memory(bytes, alignment))?;

        self.allocated.add(bytes);
        self.allocation_count.increment();
        Ok(ptr)
    }

    unsafe fn do_deallocate(&self, ptr: NonNull<u8>, bytes: usize, alignment: usize) {
        // Caller echoes the allocation arguments, which produced a valid layout.
        let layout = Layout::from_size_align_unchecked(bytes.max(1), alignment);
        dealloc(ptr.as_ptr(), layout);
        self.allocated.sub(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mr::{MemoryResourceExt, DEFAULT_ALIGNMENT};

    #[test]
    fn test_system_allocation() {
        let system = SystemResource::new();

        let ptr = system.allocate(std::mem::size_of::<u64>()).unwrap();
        assert_eq!(ptr.as_ptr() as usize % DEFAULT_ALIGNMENT, 0);
        assert_eq!(system.allocated_bytes(), 8);

        unsafe {
            ptr.as_ptr().cast::<u64>().write(42);
            assert_eq!(ptr.as_ptr().cast::<u64>().read(), 42);
            system.deallocate(ptr, 8);
        }

        assert_eq!(system.allocated_bytes(), 0);
        assert_eq!(system.peak_bytes(), 8);
        assert_eq!(system.allocation_count(), 1);
    }

    #[test]
    fn test_zero_bytes_is_not_null() {
        let system = SystemResource::new();
        let ptr = system.allocate(0).unwrap();
        unsafe { system.deallocate(ptr, 0) };
    }

    #[test]
    fn test_rejects_non_power_of_two_alignment() {
        let system = SystemResource::new();
        let err = system.allocate_aligned(64, 24).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::Allocation {
                reason: crate::mr::AllocFailure::UnsupportedAlignment,
                ..
            }
        ));
    }

    #[test]
    fn test_large_alignment() {
        let system = SystemResource::new();
        let ptr = system.allocate_aligned(10, 4096).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 4096, 0);
        unsafe { system.deallocate_aligned(ptr, 10, 4096) };
    }
}
