//! Context-tagged memory resource.

use std::ptr::{self, NonNull};

use super::context::{AnyContext, ContextProvider, ExecutionContext};
use super::error::ResourceError;
use super::kind::{Kind, MemoryKind};

#[repr(C)]
#[allow(dead_code)]
union MaxAlign {
    int: u64,
    float: f64,
    wide: u128,
    ptr: *const u8,
}

/// Alignment used when a caller does not ask for one: that of the most
/// strictly aligned scalar type.
pub const DEFAULT_ALIGNMENT: usize = std::mem::align_of::<MaxAlign>();

/// Abstract allocator for one memory kind and execution context.
///
/// Backends implement the `do_*` hooks. Consumers go through
/// [`MemoryResourceExt`], never the hooks.
///
/// Two resources compare equal iff storage allocated from one may be
/// deallocated through the other. A resource must outlive every allocation it
/// handed out.
pub trait MemoryResource<K: Kind, C: ExecutionContext = AnyContext>:
    ContextProvider<C> + Send + Sync
{
    /// Allocate at least `bytes` bytes aligned to `alignment` if supported.
    ///
    /// Storage is immediately usable only within the resource's context.
    fn do_allocate(&self, bytes: usize, alignment: usize) -> Result<NonNull<u8>, ResourceError>;

    /// Release storage obtained from `do_allocate` on an equal resource.
    ///
    /// # Safety
    ///
    /// `ptr` came from an allocation on a resource equal to `self` with exactly
    /// `bytes` and `alignment`, and has not been released yet.
    unsafe fn do_deallocate(&self, ptr: NonNull<u8>, bytes: usize, alignment: usize);

    /// Identity comparison unless overridden.
    fn do_is_equal(&self, other: &dyn MemoryResource<K, C>) -> bool {
        ptr::addr_eq(self, other)
    }
}

/// View of a resource, concrete or erased, as a trait object.
pub trait AsDynResource<K: Kind, C: ExecutionContext = AnyContext> {
    /// Borrow as `&dyn MemoryResource`.
    fn as_dyn_resource(&self) -> &dyn MemoryResource<K, C>;
}

impl<K, C, T> AsDynResource<K, C> for T
where
    K: Kind,
    C: ExecutionContext,
    T: MemoryResource<K, C>,
{
    #[inline]
    fn as_dyn_resource(&self) -> &dyn MemoryResource<K, C> {
        self
    }
}

impl<'a, K: Kind, C: ExecutionContext> AsDynResource<K, C> for dyn MemoryResource<K, C> + 'a {
    #[inline]
    fn as_dyn_resource(&self) -> &dyn MemoryResource<K, C> {
        self
    }
}

/// Public entry points of a [`MemoryResource`].
pub trait MemoryResourceExt<K: Kind, C: ExecutionContext>: MemoryResource<K, C> {
    /// Where the storage of this resource lives.
    #[inline]
    fn kind(&self) -> MemoryKind {
        K::KIND
    }

    /// Execution context in which returned storage is usable as is.
    #[inline]
    fn get_context(&self) -> C {
        C::resolve(self)
    }

    /// Allocate `bytes` bytes with [`DEFAULT_ALIGNMENT`].
    #[inline]
    fn allocate(&self, bytes: usize) -> Result<NonNull<u8>, ResourceError> {
        self.do_allocate(bytes, DEFAULT_ALIGNMENT)
    }

    /// Allocate `bytes` bytes aligned to `alignment`.
    #[inline]
    fn allocate_aligned(&self, bytes: usize, alignment: usize) -> Result<NonNull<u8>, ResourceError> {
        self.do_allocate(bytes, alignment)
    }

    /// Release storage from [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// See [`MemoryResource::do_deallocate`]; the alignment is
    /// [`DEFAULT_ALIGNMENT`].
    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) {
        self.do_deallocate(ptr, bytes, DEFAULT_ALIGNMENT)
    }

    /// Release storage from [`allocate_aligned`](Self::allocate_aligned).
    ///
    /// # Safety
    ///
    /// See [`MemoryResource::do_deallocate`].
    #[inline]
    unsafe fn deallocate_aligned(&self, ptr: NonNull<u8>, bytes: usize, alignment: usize) {
        self.do_deallocate(ptr, bytes, alignment)
    }

    /// Whether storage from `other` may be released through `self`.
    #[inline]
    fn is_equal<O>(&self, other: &O) -> bool
    where
        O: AsDynResource<K, C> + ?Sized,
    {
        self.do_is_equal(other.as_dyn_resource())
    }
}

impl<K, C, T> MemoryResourceExt<K, C> for T
where
    K: Kind,
    C: ExecutionContext,
    T: MemoryResource<K, C> + ?Sized,
{
}
