//! Chip identity
//!
//! Chip id decoding, flash size detection by aliasing, info page and IEEE
//! address reads.

mod detect;
mod types;

pub use detect::*;
pub use types::*;
