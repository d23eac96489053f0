//! ccflasher-core - Core library for TI CC111x/CC253x debug programming
//!
//! This crate implements the two-wire debug protocol of TI's 8051-based
//! radio SoCs: bit-level transfer, command framing, instruction injection,
//! and the operations derived from it (code and XDATA memory access, chip
//! erase, loader-based flash programming, lock bits, chip identification,
//! halt/step/resume and register inspection). It is `no_std` and needs only
//! `alloc`.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```ignore
//! use ccflasher_core::{programmer::DebugLink, protocol::DebugSession};
//!
//! fn dump<L: DebugLink>(link: L) -> ccflasher_core::Result<Vec<u8>> {
//!     let mut session = DebugSession::new(link);
//!     let id = session.connect();
//!     println!("Found: {} ({})", id.model(), id);
//!     let size = session.detect_flash_size()?;
//!     let mut image = vec![0; size as usize];
//!     session.read_code(0, &mut image)?;
//!     Ok(image)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod debug;
pub mod error;
pub mod flash;
pub mod programmer;
pub mod protocol;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result, TimeoutKind};
