//! Execution streams.
//!
//! [`Stream`] is what stream-ordered resources require of a stream type.
//! [`StreamView`] is a host-side implementation with FIFO semantics.

mod registry;
pub mod traits;
pub mod view;

pub use traits::Stream;
pub use view::{StreamError, StreamView};
