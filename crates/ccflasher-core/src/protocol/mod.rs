//! Two-wire debug protocol
//!
//! This module contains the command set of the CC111x/CC253x debug
//! interface, the typed instructions injected through it, the target's
//! register map, and the [`DebugSession`] that frames commands over a
//! [`DebugLink`](crate::programmer::DebugLink).

pub mod commands;
mod instruction;
pub mod regs;
mod session;

pub use commands::DebugStatus;
pub use instruction::{Encoded, Instruction};
pub use session::{DebugSession, ProgressFn};
