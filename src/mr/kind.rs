//! Memory kinds.
//!
//! A kind says where storage lives and which execution domains may touch it
//! directly. Kinds are fixed per resource type, so they are carried as marker
//! types rather than runtime fields.

use std::fmt;

/// Runtime view of a memory kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    /// Device memory, only accessible from device code.
    Device,
    /// Unified memory, accessible from both host and device.
    Unified,
    /// Page-locked host memory, accessible from both host and device.
    Pinned,
    /// Ordinary system memory, only accessible from the host.
    Host,
}

impl MemoryKind {
    /// Whether host code may dereference storage of this kind.
    pub const fn is_host_accessible(self) -> bool {
        !matches!(self, MemoryKind::Device)
    }

    /// Whether device code may dereference storage of this kind.
    pub const fn is_device_accessible(self) -> bool {
        !matches!(self, MemoryKind::Host)
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            MemoryKind::Device => "device",
            MemoryKind::Unified => "unified",
            MemoryKind::Pinned => "pinned",
            MemoryKind::Host => "host",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Device {}
    impl Sealed for super::Unified {}
    impl Sealed for super::Pinned {}
    impl Sealed for super::Host {}
}

/// Compile-time memory kind tag.
///
/// Sealed: the set of kinds is closed.
pub trait Kind: sealed::Sealed + Copy + fmt::Debug + Send + Sync + 'static {
    /// The runtime value of this tag.
    const KIND: MemoryKind;
}

/// Kinds whose storage the host may dereference without a transfer.
pub trait HostAccessible: Kind {}

/// Tag for [`MemoryKind::Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Device;

/// Tag for [`MemoryKind::Unified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Unified;

/// Tag for [`MemoryKind::Pinned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pinned;

/// Tag for [`MemoryKind::Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Host;

impl Kind for Device {
    const KIND: MemoryKind = MemoryKind::Device;
}

impl Kind for Unified {
    const KIND: MemoryKind = MemoryKind::Unified;
}

impl Kind for Pinned {
    const KIND: MemoryKind = MemoryKind::Pinned;
}

impl Kind for Host {
    const KIND: MemoryKind = MemoryKind::Host;
}

impl HostAccessible for Unified {}
impl HostAccessible for Pinned {}
impl HostAccessible for Host {}
