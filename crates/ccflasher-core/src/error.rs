//! Error types for ccflasher-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate. Protocol operations never panic; every failure the
//! caller may want to react to (for example by issuing a recovery jump or
//! resetting the target) comes back as one of these values.

use core::fmt;

/// Which protocol operation ran out of time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// The high-speed clock never reported stable after clock init
    ClockInit,
    /// The chip-erase-done status bit never came up
    ChipErase,
    /// The flash loader did not halt after programming a chunk
    FlashWrite {
        /// Flash word address the stalled chunk started at
        word_address: u32,
    },
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A polled status bit did not change within its time budget
    Timeout(TimeoutKind),
    /// Code memory differs from the expected image
    VerifyMismatch {
        /// Byte address of the first differing byte
        address: u32,
        /// Value the image holds
        expected: u8,
        /// Value read back from the target
        actual: u8,
    },
    /// Injected instructions must be 1 to 3 bytes long
    InvalidInstruction,
    /// Flash is programmed in 16-bit words; odd lengths and addresses are rejected
    InvalidAlignment,
    /// Address lies outside the target's code or data space
    AddressOutOfBounds,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClockInit => write!(f, "clock did not stabilise"),
            Self::ChipErase => write!(f, "chip erase did not complete"),
            Self::FlashWrite { word_address } => write!(
                f,
                "flash loader did not finish chunk at byte address 0x{:05X}",
                word_address * 2
            ),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(kind) => write!(f, "timeout: {}", kind),
            Self::VerifyMismatch {
                address,
                expected,
                actual,
            } => write!(
                f,
                "verify failed at 0x{:05X}: expected 0x{:02X}, found 0x{:02X}",
                address, expected, actual
            ),
            Self::InvalidInstruction => write!(f, "instruction must be 1-3 bytes"),
            Self::InvalidAlignment => write!(f, "invalid alignment"),
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
