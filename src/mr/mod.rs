//! Memory resource interfaces.
//!
//! - [`MemoryResource`]: synchronous allocation for one memory kind and
//!   execution context.
//! - [`StreamOrderedMemoryResource`]: allocation ordered on an execution
//!   stream; the synchronous interface is derived from it.
//! - [`HostAllocatorAdaptor`]: exposes a host-accessible resource through the
//!   standard allocator traits.

pub mod adaptor;
pub mod context;
pub mod error;
pub mod kind;
pub mod resource;
pub mod stream_ordered;

pub use adaptor::HostAllocatorAdaptor;
pub use context::{AnyContext, ContextProvider, DeviceContext, ExecutionContext};
pub use error::{AllocFailure, BoxError, ResourceError};
pub use kind::{Device, Host, HostAccessible, Kind, MemoryKind, Pinned, Unified};
pub use resource::{AsDynResource, MemoryResource, MemoryResourceExt, DEFAULT_ALIGNMENT};
pub use stream_ordered::{StreamOrderedMemoryResource, StreamOrderedMemoryResourceExt};
