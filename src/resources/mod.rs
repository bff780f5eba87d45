//! Reference backends.
//!
//! Small resources for host-only use and for testing consumers of the
//! resource traits without a device. Not allocation strategies in their own
//! right.

pub mod config;
pub mod emulated;
pub mod system;

pub use config::EmulatedConfig;
pub use emulated::{EmulatedStats, EmulatedStreamResource};
pub use system::SystemResource;
