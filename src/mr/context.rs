//! Execution context tags.
//!
//! A context names the execution domain in which storage returned by a
//! resource is usable without further synchronization. Most resources live in
//! [`AnyContext`], where the answer is known statically and no call through
//! the resource is needed to obtain it.

use std::fmt;

/// Hook a resource implements to report its runtime context.
///
/// Implemented for every type when `C` is [`AnyContext`], so backends in the
/// default context never write it.
pub trait ContextProvider<C> {
    /// Report the execution context of this resource.
    fn do_get_context(&self) -> C;
}

impl<T: ?Sized> ContextProvider<AnyContext> for T {
    #[inline]
    fn do_get_context(&self) -> AnyContext {
        AnyContext
    }
}

/// A context tag type.
pub trait ExecutionContext: Copy + fmt::Debug + Send + Sync + 'static {
    /// Obtain the context of `resource`.
    ///
    /// Contexts that are statically known override this to skip the
    /// resource entirely.
    #[inline]
    fn resolve<R>(resource: &R) -> Self
    where
        R: ContextProvider<Self> + ?Sized,
    {
        resource.do_get_context()
    }
}

/// Storage is usable on any thread or stream without synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AnyContext;

impl ExecutionContext for AnyContext {
    #[inline]
    fn resolve<R>(_resource: &R) -> Self
    where
        R: ContextProvider<Self> + ?Sized,
    {
        AnyContext
    }
}

/// Storage is usable without synchronization only on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceContext {
    /// Device ordinal.
    pub device: u32,
}

impl DeviceContext {
    /// Context for the given device ordinal.
    pub const fn new(device: u32) -> Self {
        Self { device }
    }
}

impl ExecutionContext for DeviceContext {}

impl fmt::Display for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device:{}", self.device)
    }
}
