//! Bridge from a memory resource to the standard host allocator traits.
//!
//! Only host-accessible kinds may be adapted; wrapping a device resource is a
//! compile error:
//!
//! ```compile_fail
//! use streamalloc::mr::{Device, HostAllocatorAdaptor, StreamOrderedMemoryResource};
//! use streamalloc::resources::EmulatedStreamResource;
//!
//! let device = EmulatedStreamResource::<Device>::default();
//! let _ = HostAllocatorAdaptor::<_, Device>::new(&device);
//! ```

use std::alloc::{GlobalAlloc, Layout};
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::{self, NonNull};

use super::context::{AnyContext, ExecutionContext};
use super::kind::HostAccessible;
use super::resource::{AsDynResource, MemoryResource, MemoryResourceExt};

/// Adapts a pointer-like handle to a host-accessible resource into a
/// [`GlobalAlloc`] (and, with the `nightly` feature, an `Allocator`).
///
/// `C` is the execution context of the wrapped resource. The host allocator
/// traits carry no context, so any context can be adapted.
///
/// # Example
///
/// ```rust
/// use std::alloc::{GlobalAlloc, Layout};
/// use streamalloc::mr::{Host, HostAllocatorAdaptor};
/// use streamalloc::resources::SystemResource;
///
/// let system = SystemResource::new();
/// let adaptor = HostAllocatorAdaptor::<_, Host>::new(&system);
///
/// let layout = Layout::from_size_align(64, 16).unwrap();
/// unsafe {
///     let ptr = adaptor.alloc(layout);
///     assert!(!ptr.is_null());
///     adaptor.dealloc(ptr, layout);
/// }
/// ```
pub struct HostAllocatorAdaptor<P, K, C = AnyContext> {
    resource: P,
    _kind: PhantomData<fn() -> (K, C)>,
}

impl<P, K, C> HostAllocatorAdaptor<P, K, C>
where
    K: HostAccessible,
    C: ExecutionContext,
    P: Deref,
    P::Target: MemoryResource<K, C> + AsDynResource<K, C>,
{
    /// Wrap `resource`.
    pub fn new(resource: P) -> Self {
        Self {
            resource,
            _kind: PhantomData,
        }
    }

    /// The wrapped resource.
    pub fn resource(&self) -> &P::Target {
        &self.resource
    }

    /// Unwrap the handle.
    pub fn into_inner(self) -> P {
        self.resource
    }

    /// True if both adaptors wrap the same resource, or `other`'s resource
    /// reports equality with ours.
    ///
    /// Equality is asked of `other`'s resource, so an asymmetric override on
    /// the resources makes this relation asymmetric too.
    pub fn is_equal<Q>(&self, other: &HostAllocatorAdaptor<Q, K, C>) -> bool
    where
        Q: Deref,
        Q::Target: MemoryResource<K, C> + AsDynResource<K, C>,
    {
        ptr::addr_eq(self.resource(), other.resource())
            || other.resource().is_equal(self.resource())
    }
}

impl<P: Clone, K, C> Clone for HostAllocatorAdaptor<P, K, C> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
            _kind: PhantomData,
        }
    }
}

impl<P, K, C> std::fmt::Debug for HostAllocatorAdaptor<P, K, C>
where
    K: HostAccessible,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostAllocatorAdaptor")
            .field("kind", &K::KIND)
            .finish_non_exhaustive()
    }
}

unsafe impl<P, K, C> GlobalAlloc for HostAllocatorAdaptor<P, K, C>
where
    K: HostAccessible,
    C: ExecutionContext,
    P: Deref,
    P::Target: MemoryResource<K, C> + AsDynResource<K, C>,
{
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        match self.resource.allocate_aligned(layout.size(), layout.align()) {
            Ok(ptr) => ptr.as_ptr(),
            Err(_) => ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            self.resource
                .deallocate_aligned(ptr, layout.size(), layout.align());
        }
    }
}

#[cfg(feature = "nightly")]
mod allocator_impl {
    use std::alloc::{AllocError, Allocator, Layout};
    use std::ops::Deref;
    use std::ptr::NonNull;

    use super::HostAllocatorAdaptor;
    use crate::mr::context::ExecutionContext;
    use crate::mr::kind::HostAccessible;
    use crate::mr::resource::{AsDynResource, MemoryResource, MemoryResourceExt};

    unsafe impl<P, K, C> Allocator for HostAllocatorAdaptor<P, K, C>
    where
        K: HostAccessible,
        C: ExecutionContext,
        P: Deref,
        P::Target: MemoryResource<K, C> + AsDynResource<K, C>,
    {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            self.resource()
                .allocate_aligned(layout.size(), layout.align())
                .map(|ptr| NonNull::slice_from_raw_parts(ptr, layout.size()))
                .map_err(|_| AllocError)
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.resource()
                .deallocate_aligned(ptr, layout.size(), layout.align());
        }
    }
}
