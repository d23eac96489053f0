//! Debug interface command bytes and status register layout
//!
//! Each command is sent as its command byte followed by 0-3 argument bytes.
//! Every command answers with exactly one byte except [`GET_CHIP_ID`], which
//! answers with two.

use bitflags::bitflags;

// ============================================================================
// Commands
// ============================================================================

/// Execute a 1-byte instruction (`0x55, opcode`)
pub const DEBUG_INSTR_1: u8 = 0x55;
/// Execute a 2-byte instruction (`0x56, opcode, operand`)
pub const DEBUG_INSTR_2: u8 = 0x56;
/// Execute a 3-byte instruction (`0x57, opcode, operand, operand`)
pub const DEBUG_INSTR_3: u8 = 0x57;

/// Write debug configuration (selects info page vs. normal flash page)
pub const WR_CONFIG: u8 = 0x1D;
/// Read debug configuration
pub const RD_CONFIG: u8 = 0x24;

/// Erase the entire flash, including the lock bits
pub const CHIP_ERASE: u8 = 0x14;
/// Read the debug status byte
pub const READ_STATUS: u8 = 0x34;
/// Leave the halted state and run from the current program counter
pub const RESUME: u8 = 0x4C;
/// Execute exactly one instruction at the program counter
pub const STEP_INSTR: u8 = 0x5C;
/// Read {chip id, revision}
pub const GET_CHIP_ID: u8 = 0x68;

// ============================================================================
// Configuration values for WR_CONFIG
// ============================================================================

/// Normal flash page (code memory)
pub const CONFIG_MAIN_PAGE: u8 = 0x00;
/// Flash information page (lock bits)
pub const CONFIG_INFO_PAGE: u8 = 0x01;

// ============================================================================
// Status register
// ============================================================================

bitflags! {
    /// Debug status byte returned by [`READ_STATUS`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DebugStatus: u8 {
        /// Chip erase has finished
        const CHIP_ERASE_DONE   = 1 << 7;
        /// PCON.IDLE is set
        const PCON_IDLE         = 1 << 6;
        /// CPU is halted
        const CPU_HALTED        = 1 << 5;
        /// Target is in power mode 0
        const POWER_MODE_0      = 1 << 4;
        /// CPU halted on a breakpoint or trap opcode
        const HALT_STATUS       = 1 << 3;
        /// Debug access is locked
        const DEBUG_LOCKED      = 1 << 2;
        /// Oscillators are stable
        const OSCILLATOR_STABLE = 1 << 1;
        /// Stack overflow occurred
        const STACK_OVERFLOW    = 1 << 0;
    }
}

impl DebugStatus {
    /// Whether the CPU is currently halted
    pub fn is_halted(self) -> bool {
        self.contains(Self::CPU_HALTED)
    }
}
