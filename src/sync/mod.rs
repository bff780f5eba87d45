//! Synchronization primitives.
//!
//! Thin wrappers over std or parking_lot mutexes, plus statistics atomics.

pub(crate) mod atomics;
pub(crate) mod mutex;
