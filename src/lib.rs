//! # streamalloc
//!
//! Stream-ordered, context-aware memory resource interfaces.
//!
//! Backends for device, unified, pinned and host memory implement a small set
//! of hooks and become interchangeable behind one polymorphic interface. The
//! interesting part is the contract on *when* memory is usable:
//!
//! - a [`MemoryResource`](mr::MemoryResource) hands out storage usable right
//!   away within its execution context;
//! - a [`StreamOrderedMemoryResource`](mr::StreamOrderedMemoryResource) hands
//!   out storage usable right away only on the stream it was allocated on, and
//!   derives the synchronous interface by synchronizing the default stream
//!   around its async primitives.
//!
//! ## Features
//!
//! - Memory kind and execution context as type parameters
//! - Identity-based resource equality, overridable per backend
//! - Host-emulated execution streams ([`StreamView`](stream::StreamView))
//! - Adaptor to `std::alloc::GlobalAlloc` (and `Allocator` on nightly) for
//!   host-accessible kinds
//!
//! ## Quick Start
//!
//! ```rust
//! use streamalloc::mr::{Device, MemoryResourceExt, StreamOrderedMemoryResourceExt};
//! use streamalloc::resources::EmulatedStreamResource;
//! use streamalloc::stream::StreamView;
//!
//! let mr = EmulatedStreamResource::<Device>::default();
//! let stream = StreamView::new();
//!
//! let ptr = mr.allocate_async(1024, stream)?;
//! // ... enqueue work using `ptr` on `stream` ...
//! unsafe { mr.deallocate_async(ptr, 1024, stream) };
//!
//! // Synchronous path: usable anywhere on return.
//! let ptr = mr.allocate(256)?;
//! unsafe { mr.deallocate(ptr, 256) };
//! # Ok::<(), streamalloc::mr::ResourceError>(())
//! ```

#![cfg_attr(feature = "nightly", feature(allocator_api))]

mod diagnostics;
mod sync;
mod util;

pub mod mr;
pub mod resources;
pub mod stream;

// Re-export the core interface at crate root for convenience
pub use mr::{
    AnyContext, DeviceContext, ExecutionContext, HostAllocatorAdaptor, MemoryKind,
    MemoryResource, MemoryResourceExt, ResourceError, StreamOrderedMemoryResource,
    StreamOrderedMemoryResourceExt, DEFAULT_ALIGNMENT,
};
pub use stream::{Stream, StreamError, StreamView};
