//! Flash and memory operations
//!
//! Code memory reads and verifies, XDATA access, chip erase, the loader-based
//! flash write, and lock byte programming. All of them are methods on
//! [`DebugSession`](crate::protocol::DebugSession).

mod loader;
mod lock;
mod operations;

pub use loader::*;
pub use lock::*;
pub use operations::*;
