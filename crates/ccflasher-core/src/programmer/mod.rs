//! Programmer traits and abstractions
//!
//! This module defines the traits a host backend implements to reach the
//! target's debug interface: byte-level [`DebugLink`] and pin-level
//! [`BitbangDebugWire`].

pub mod bitbang;
mod traits;

pub use bitbang::{BitbangDebugWire, BitbangLink, DataDirection};
pub use traits::*;
