//! Integration tests for streamalloc.

use std::alloc::{GlobalAlloc, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use streamalloc::mr::{
    AnyContext, ContextProvider, Device, DeviceContext, Host, HostAllocatorAdaptor, MemoryKind,
    MemoryResource, MemoryResourceExt, Pinned, ResourceError, StreamOrderedMemoryResource,
    StreamOrderedMemoryResourceExt, Unified, DEFAULT_ALIGNMENT,
};
use streamalloc::resources::{EmulatedConfig, EmulatedStreamResource, SystemResource};
use streamalloc::stream::{Stream, StreamView};

/// Pinned resource tied to one device, delegating to the system allocator.
struct DevicePinned {
    device: u32,
    system: SystemResource,
}

impl ContextProvider<DeviceContext> for DevicePinned {
    fn do_get_context(&self) -> DeviceContext {
        DeviceContext::new(self.device)
    }
}

impl MemoryResource<Pinned, DeviceContext> for DevicePinned {
    fn do_allocate(&self, bytes: usize, alignment: usize) -> Result<NonNull<u8>, ResourceError> {
        self.system.allocate_aligned(bytes, alignment)
    }

    unsafe fn do_deallocate(&self, ptr: NonNull<u8>, bytes: usize, alignment: usize) {
        self.system.deallocate_aligned(ptr, bytes, alignment)
    }

    fn do_is_equal(&self, other: &dyn MemoryResource<Pinned, DeviceContext>) -> bool {
        // Same device means interchangeable storage.
        other.get_context() == self.get_context()
    }
}

#[test]
fn test_allocate_then_deallocate_never_raises() {
    let system = SystemResource::new();
    let device = EmulatedStreamResource::<Device>::default();
    let unified = EmulatedStreamResource::<Unified>::default();

    for &(bytes, alignment) in &[(1, 1), (7, 8), (64, 16), (1000, 64), (4096, 4096)] {
        let p = system.allocate_aligned(bytes, alignment).unwrap();
        unsafe { system.deallocate_aligned(p, bytes, alignment) };

        let p = device.allocate_aligned(bytes, alignment).unwrap();
        unsafe { device.deallocate_aligned(p, bytes, alignment) };

        let p = unified.allocate_aligned(bytes, alignment).unwrap();
        unsafe { unified.deallocate_aligned(p, bytes, alignment) };
    }
    assert_eq!(system.allocated_bytes(), 0);
    assert_eq!(device.stats().live_bytes, 0);
}

#[test]
fn test_reflexive_equality() {
    let system = SystemResource::new();
    let device = EmulatedStreamResource::<Device>::default();
    let pinned = DevicePinned {
        device: 0,
        system: SystemResource::new(),
    };

    assert!(system.is_equal(&system));
    assert!(device.is_equal(&device));
    assert!(pinned.is_equal(&pinned));
}

#[test]
fn test_default_alignment_applies_when_unspecified() {
    let system = SystemResource::new();
    for bytes in [1, 3, 17, 100] {
        let p = system.allocate(bytes).unwrap();
        assert_eq!(p.as_ptr() as usize % DEFAULT_ALIGNMENT, 0);
        unsafe { system.deallocate(p, bytes) };
    }
    assert_eq!(DEFAULT_ALIGNMENT, std::mem::align_of::<u128>().max(std::mem::align_of::<f64>()));
}

#[test]
fn test_device_allocation_on_stream() {
    let mr = EmulatedStreamResource::<Device>::default();
    let stream_a = StreamView::new();

    let ptr = mr.allocate_async(1024, stream_a).unwrap();
    assert_eq!(ptr.as_ptr() as usize % DEFAULT_ALIGNMENT, 0);
    assert_eq!(mr.kind(), MemoryKind::Device);

    // Usable on stream A without synchronization.
    let addr = ptr.as_ptr() as usize;
    stream_a.enqueue(move || unsafe { (addr as *mut u8).write_bytes(0xAB, 1024) });

    unsafe { mr.deallocate_async(ptr, 1024, stream_a) };
    stream_a.synchronize().unwrap();
    assert_eq!(mr.stats().live_bytes, 0);
}

#[test]
fn test_dealloc_then_alloc_on_same_stream_without_sync() {
    let mr = EmulatedStreamResource::<Device>::default();
    let stream = StreamView::new();
    let writes = Arc::new(AtomicUsize::new(0));

    let p = mr.allocate_async(256, stream).unwrap();
    let counter = Arc::clone(&writes);
    let addr = p.as_ptr() as usize;
    stream.enqueue(move || {
        unsafe { (addr as *mut u8).write_bytes(1, 256) };
        counter.fetch_add(1, Ordering::SeqCst);
    });

    unsafe { mr.deallocate_async(p, 256, stream) };
    let q = mr.allocate_async(256, stream).unwrap();
    assert_eq!(p, q);

    // Work enqueued before the deallocation still has not run.
    assert_eq!(writes.load(Ordering::SeqCst), 0);
    assert!(!stream.is_idle());

    stream.synchronize().unwrap();
    assert_eq!(writes.load(Ordering::SeqCst), 1);
    unsafe { mr.deallocate_async(q, 256, stream) };
    stream.destroy().unwrap();
}

#[test]
fn test_sync_allocate_drains_default_stream() {
    let mr = EmulatedStreamResource::<Unified>::default();
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&ran);
    StreamView::DEFAULT.enqueue(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let p = mr.allocate(64).unwrap();
    assert!(ran.load(Ordering::SeqCst) >= 1);
    unsafe { mr.deallocate(p, 64) };
}

#[test]
fn test_host_adaptor_wraps_resource() {
    let system = Arc::new(SystemResource::new());
    let a = HostAllocatorAdaptor::<_, Host>::new(Arc::clone(&system));
    let b = HostAllocatorAdaptor::<_, Host>::new(Arc::clone(&system));

    assert!(std::ptr::eq(a.resource(), &*system));
    assert!(a.is_equal(&b));

    let layout = Layout::from_size_align(128, 32).unwrap();
    unsafe {
        let p = a.alloc(layout);
        assert!(!p.is_null());
        // Equal adaptors may free each other's storage.
        b.dealloc(p, layout);
    }
    assert_eq!(system.allocated_bytes(), 0);
}

#[test]
fn test_host_adaptor_defers_to_resource_equality() {
    let first = DevicePinned {
        device: 1,
        system: SystemResource::new(),
    };
    let second = DevicePinned {
        device: 1,
        system: SystemResource::new(),
    };
    let other_device = DevicePinned {
        device: 2,
        system: SystemResource::new(),
    };

    assert_eq!(first.get_context(), DeviceContext::new(1));

    let over_first = HostAllocatorAdaptor::<_, Pinned, DeviceContext>::new(&first);
    let over_second = HostAllocatorAdaptor::<_, Pinned, DeviceContext>::new(&second);
    let over_other = HostAllocatorAdaptor::<_, Pinned, DeviceContext>::new(&other_device);

    // Distinct instances: equality comes from the resources, not identity.
    assert!(over_first.is_equal(&over_second));
    assert!(over_second.is_equal(&over_first));
    assert!(!over_first.is_equal(&over_other));
    assert!(!over_other.is_equal(&over_first));

    // Storage from one adaptor may be released through an equal one.
    let layout = Layout::from_size_align(128, 16).unwrap();
    unsafe {
        let ptr = over_first.alloc(layout);
        assert!(!ptr.is_null());
        over_second.dealloc(ptr, layout);
    }
}

#[test]
fn test_distinct_backends_compare_unequal() {
    let system = SystemResource::new();
    let emulated = EmulatedStreamResource::<Host>::new(EmulatedConfig::minimal());

    let erased_system: &dyn MemoryResource<Host> = &system;
    let erased_emulated: &dyn MemoryResource<Host> = &emulated;
    assert!(!erased_system.is_equal(erased_emulated));
    assert!(!erased_emulated.is_equal(erased_system));

    let twin = SystemResource::new();
    assert!(!system.is_equal(&twin));
}

#[test]
fn test_any_context_for_stream_ordered() {
    let mr = EmulatedStreamResource::<Pinned>::default();
    assert_eq!(mr.get_context(), AnyContext);
    assert!(StreamView::default_stream().is_default());
}

#[test]
fn test_shared_resource_across_threads() {
    let mr: Arc<dyn StreamOrderedMemoryResource<Device, Stream = StreamView>> =
        Arc::new(EmulatedStreamResource::<Device>::default());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let mr = Arc::clone(&mr);
            thread::spawn(move || {
                let stream = StreamView::new();
                let bytes = 64 * (i + 1);
                let mut held = Vec::new();
                for _ in 0..16 {
                    held.push(mr.allocate_async(bytes, stream).unwrap());
                }
                for p in held {
                    unsafe { mr.deallocate_async(p, bytes, stream) };
                }
                stream.destroy().unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(mr.is_equal(&*mr));
}

#[test]
fn test_allocation_failure_is_an_error_not_null() {
    let mr = EmulatedStreamResource::<Device>::new(
        EmulatedConfig::minimal().with_reclaim_on_exhaustion(false),
    );
    let stream = StreamView::new();
    let err = mr.allocate_async(2 * 1024 * 1024, stream).unwrap_err();
    assert!(err.is_allocation_failure());
    assert!(err.to_string().contains("out of memory"));
}
