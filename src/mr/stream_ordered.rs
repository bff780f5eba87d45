//! Stream-ordered memory resource.
//!
//! Allocating on stream `s0` returns storage that may be used immediately only
//! on `s0`; any other stream or the host must synchronize with `s0` first.
//! Deallocating on `s1` makes the storage reusable by the next allocation on
//! `s1` without synchronization. Work already enqueued on `s1` may still touch
//! the storage after the call returns.
//!
//! Allocating on `s0` and deallocating on a different `s1` is allowed, but the
//! caller must synchronize `s0` and `s1` before the deallocation.

use std::ptr::{self, NonNull};

use super::context::AnyContext;
use super::error::ResourceError;
use super::kind::Kind;
use super::resource::{AsDynResource, MemoryResource, DEFAULT_ALIGNMENT};
use crate::stream::Stream;

/// Resource whose allocations are ordered on an execution stream.
///
/// Backends implement the async hooks only; the synchronous
/// [`MemoryResource`] contract is derived from them:
///
/// - allocate: synchronize the default stream, allocate on it, synchronize it
///   again, so the storage is usable anywhere on return;
/// - deallocate: synchronize the default stream, then deallocate on it.
///
/// Stream-ordered resources always live in [`AnyContext`].
pub trait StreamOrderedMemoryResource<K: Kind>: AsDynResource<K> + Send + Sync {
    /// Stream type the resource orders its work on.
    type Stream: Stream;

    /// Allocate at least `bytes` bytes on `stream`, aligned to `alignment` if
    /// supported.
    fn do_allocate_async(
        &self,
        bytes: usize,
        alignment: usize,
        stream: Self::Stream,
    ) -> Result<NonNull<u8>, ResourceError>;

    /// Release storage on `stream`.
    ///
    /// # Safety
    ///
    /// `ptr` came from an allocation on a resource equal to `self` with exactly
    /// `bytes` and `alignment`, has not been released, and is not in use on
    /// any stream other than `stream` or on the host.
    unsafe fn do_deallocate_async(
        &self,
        ptr: NonNull<u8>,
        bytes: usize,
        alignment: usize,
        stream: Self::Stream,
    );

    /// Identity comparison unless overridden.
    fn do_is_equal(&self, other: &dyn MemoryResource<K>) -> bool {
        ptr::addr_eq(self, other)
    }
}

impl<K, T> MemoryResource<K, AnyContext> for T
where
    K: Kind,
    T: StreamOrderedMemoryResource<K> + ?Sized,
{
    fn do_allocate(&self, bytes: usize, alignment: usize) -> Result<NonNull<u8>, ResourceError> {
        let stream = T::Stream::default_stream();
        stream.synchronize().map_err(ResourceError::invalid_state)?;

        let ptr = self.do_allocate_async(bytes, alignment, stream)?;

        if let Err(err) = stream.synchronize() {
            // SAFETY: just allocated on `stream` with these arguments and never
            // handed out.
            unsafe { self.do_deallocate_async(ptr, bytes, alignment, stream) };
            return Err(ResourceError::invalid_state(err));
        }
        Ok(ptr)
    }

    unsafe fn do_deallocate(&self, ptr: NonNull<u8>, bytes: usize, alignment: usize) {
        let stream = T::Stream::default_stream();
        stream.synchronize_no_throw();
        self.do_deallocate_async(ptr, bytes, alignment, stream);
    }

    fn do_is_equal(&self, other: &dyn MemoryResource<K>) -> bool {
        <T as StreamOrderedMemoryResource<K>>::do_is_equal(self, other)
    }
}

/// Public stream-ordered entry points.
pub trait StreamOrderedMemoryResourceExt<K: Kind>: StreamOrderedMemoryResource<K> {
    /// Allocate `bytes` bytes with [`DEFAULT_ALIGNMENT`] on `stream`.
    #[inline]
    fn allocate_async(&self, bytes: usize, stream: Self::Stream) -> Result<NonNull<u8>, ResourceError> {
        self.do_allocate_async(bytes, DEFAULT_ALIGNMENT, stream)
    }

    /// Allocate `bytes` bytes aligned to `alignment` on `stream`.
    #[inline]
    fn allocate_async_aligned(
        &self,
        bytes: usize,
        alignment: usize,
        stream: Self::Stream,
    ) -> Result<NonNull<u8>, ResourceError> {
        self.do_allocate_async(bytes, alignment, stream)
    }

    /// Release storage from [`allocate_async`](Self::allocate_async) or a
    /// default-aligned synchronous allocation, in order on `stream`.
    ///
    /// # Safety
    ///
    /// See [`StreamOrderedMemoryResource::do_deallocate_async`]; the alignment
    /// is [`DEFAULT_ALIGNMENT`].
    #[inline]
    unsafe fn deallocate_async(&self, ptr: NonNull<u8>, bytes: usize, stream: Self::Stream) {
        self.do_deallocate_async(ptr, bytes, DEFAULT_ALIGNMENT, stream)
    }

    /// Release storage in order on `stream`.
    ///
    /// # Safety
    ///
    /// See [`StreamOrderedMemoryResource::do_deallocate_async`].
    #[inline]
    unsafe fn deallocate_async_aligned(
        &self,
        ptr: NonNull<u8>,
        bytes: usize,
        alignment: usize,
        stream: Self::Stream,
    ) {
        self.do_deallocate_async(ptr, bytes, alignment, stream)
    }
}

impl<K, T> StreamOrderedMemoryResourceExt<K> for T
where
    K: Kind,
    T: StreamOrderedMemoryResource<K> + ?Sized,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mr::kind::Device;
    use crate::mr::resource::MemoryResourceExt;
    use std::alloc::{alloc, dealloc, Layout};
    use std::cell::RefCell;
    use std::fmt;

    thread_local! {
        static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Sync(u32),
        Alloc(u32),
        Free(u32),
    }

    fn record(event: Event) {
        EVENTS.with(|events| events.borrow_mut().push(event));
    }

    fn take_events() -> Vec<Event> {
        EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
    }

    #[derive(Debug)]
    struct Faulted;

    impl fmt::Display for Faulted {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("faulted")
        }
    }

    impl std::error::Error for Faulted {}

    thread_local! {
        static FAIL_SYNC_AFTER: RefCell<Option<usize>> = const { RefCell::new(None) };
    }

    /// Stream that logs every synchronize on the current thread.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct Recorded(u32);

    impl Stream for Recorded {
        type Error = Faulted;

        fn default_stream() -> Self {
            Recorded(0)
        }

        fn synchronize(&self) -> Result<(), Faulted> {
            record(Event::Sync(self.0));
            FAIL_SYNC_AFTER.with(|fail| {
                let mut fail = fail.borrow_mut();
                match *fail {
                    Some(0) => Err(Faulted),
                    Some(n) => {
                        *fail = Some(n - 1);
                        Ok(())
                    }
                    None => Ok(()),
                }
            })
        }
    }

    struct Backend(#[allow(dead_code)] u8);

    impl StreamOrderedMemoryResource<Device> for Backend {
        type Stream = Recorded;

        fn do_allocate_async(
            &self,
            bytes: usize,
            alignment: usize,
            stream: Recorded,
        ) -> Result<NonNull<u8>, ResourceError> {
            record(Event::Alloc(stream.0));
            let layout = Layout::from_size_align(bytes, alignment)
                .map_err(|_| ResourceError::unsupported_alignment(bytes, alignment))?;
            NonNull::new(unsafe { alloc(layout) })
                .ok_or_else(|| ResourceError::out_of_memory(bytes, alignment))
        }

        unsafe fn do_deallocate_async(
            &self,
            ptr: NonNull<u8>,
            bytes: usize,
            alignment: usize,
            stream: Recorded,
        ) {
            record(Event::Free(stream.0));
            dealloc(ptr.as_ptr(), Layout::from_size_align_unchecked(bytes, alignment));
        }
    }

    #[test]
    fn test_sync_allocate_brackets_async_with_default_stream_syncs() {
        take_events();
        let backend = Backend(0);
        let ptr = backend.allocate(64).unwrap();
        assert_eq!(
            take_events(),
            vec![Event::Sync(0), Event::Alloc(0), Event::Sync(0)]
        );

        unsafe { backend.deallocate(ptr, 64) };
        assert_eq!(take_events(), vec![Event::Sync(0), Event::Free(0)]);
    }

    #[test]
    fn test_async_paths_do_not_synchronize() {
        take_events();
        let backend = Backend(0);
        let ptr = backend.allocate_async(128, Recorded(5)).unwrap();
        unsafe { backend.deallocate_async(ptr, 128, Recorded(5)) };
        assert_eq!(take_events(), vec![Event::Alloc(5), Event::Free(5)]);
    }

    #[test]
    fn test_failed_trailing_sync_releases_block() {
        take_events();
        FAIL_SYNC_AFTER.with(|fail| *fail.borrow_mut() = Some(1));

        let err = Backend(0).allocate(32).unwrap_err();
        FAIL_SYNC_AFTER.with(|fail| *fail.borrow_mut() = None);

        assert!(!err.is_allocation_failure());
        assert_eq!(
            take_events(),
            vec![Event::Sync(0), Event::Alloc(0), Event::Sync(0), Event::Free(0)]
        );
    }

    #[test]
    fn test_failed_leading_sync_skips_allocation() {
        take_events();
        FAIL_SYNC_AFTER.with(|fail| *fail.borrow_mut() = Some(0));

        let err = Backend(0).allocate(32).unwrap_err();
        FAIL_SYNC_AFTER.with(|fail| *fail.borrow_mut() = None);

        assert!(matches!(err, ResourceError::InvalidState(_)));
        assert_eq!(take_events(), vec![Event::Sync(0)]);
    }

    #[test]
    fn test_deallocate_proceeds_when_sync_fails() {
        let backend = Backend(0);
        let ptr = backend.allocate(16).unwrap();
        take_events();

        FAIL_SYNC_AFTER.with(|fail| *fail.borrow_mut() = Some(0));
        unsafe { backend.deallocate(ptr, 16) };
        FAIL_SYNC_AFTER.with(|fail| *fail.borrow_mut() = None);

        assert_eq!(take_events(), vec![Event::Sync(0), Event::Free(0)]);
    }

    #[test]
    fn test_erased_stream_ordered_resource() {
        let a = Backend(1);
        let b = Backend(2);
        let erased: &dyn StreamOrderedMemoryResource<Device, Stream = Recorded> = &a;

        assert!(erased.is_equal(&a));
        assert!(a.is_equal(erased));
        assert!(!erased.is_equal(&b));

        let ptr = erased.allocate_async(8, Recorded(1)).unwrap();
        unsafe { erased.deallocate_async(ptr, 8, Recorded(1)) };
    }
}
