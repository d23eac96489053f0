//! Flash loader microprogram
//!
//! The debug link is far too slow to feed the flash controller byte by byte
//! within its write timing, so a short routine is copied into target RAM and
//! run there. It streams words from the scratch buffer into `FWDATA`, waits
//! for `FCTL.BUSY` after every word, and halts on the trap opcode when done.
//!
//! ```text
//! 00  75 AD hh    MOV  FADDRH, #addr_hi
//! 03  75 AC ll    MOV  FADDRL, #addr_lo
//! 06  90 F0 00    MOV  DPTR, #0xF000
//! 09  75 AE 02    MOV  FCTL, #WRITE
//! 0C  7D nn       MOV  R5, #words
//! 0E  E0          MOVX A, @DPTR        ; loop
//! 0F  F5 AF       MOV  FWDATA, A
//! 11  A3          INC  DPTR
//! 12  E0          MOVX A, @DPTR
//! 13  F5 AF       MOV  FWDATA, A
//! 15  A3          INC  DPTR
//! 16  E5 AE       MOV  A, FCTL         ; busy
//! 18  20 E6 FB    JB   ACC.6, busy
//! 1B  DD F1       DJNZ R5, loop
//! 1D  A5          trap (halt)
//! ```

use crate::protocol::regs;

/// Length of the loader in bytes
pub const LOADER_LEN: usize = 30;

/// Most words one loader run can program (`R5` is 8 bits, 0 would mean 256)
pub const MAX_WORDS_PER_RUN: u8 = 255;

/// Byte offset of the flash word address high byte operand
pub const PATCH_ADDR_HIGH: usize = 2;
/// Byte offset of the flash word address low byte operand
pub const PATCH_ADDR_LOW: usize = 5;
/// Byte offset of the word count operand
pub const PATCH_WORD_COUNT: usize = 13;

#[rustfmt::skip]
const TEMPLATE: [u8; LOADER_LEN] = [
    0x75, regs::SFR_FADDRH, 0x00,
    0x75, regs::SFR_FADDRL, 0x00,
    0x90, (regs::XDATA_SCRATCH >> 8) as u8, regs::XDATA_SCRATCH as u8,
    0x75, regs::SFR_FCTL, regs::FCTL_WRITE,
    0x7D, 0x00,
    0xE0,
    0xF5, regs::SFR_FWDATA,
    0xA3,
    0xE0,
    0xF5, regs::SFR_FWDATA,
    0xA3,
    0xE5, regs::SFR_FCTL,
    0x20, regs::BIT_ACC_6, 0xFB,
    0xDD, 0xF1,
    0xA5,
];

/// A flash loader patched for one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashLoader {
    code: [u8; LOADER_LEN],
}

impl FlashLoader {
    /// Loader programming `words` 16-bit words starting at flash word `word_address`
    ///
    /// Only the low 16 bits of the word address are patched in; that covers
    /// the full 256 KiB code space.
    pub fn new(word_address: u32, words: u8) -> Self {
        let mut code = TEMPLATE;
        code[PATCH_ADDR_HIGH] = (word_address >> 8) as u8;
        code[PATCH_ADDR_LOW] = word_address as u8;
        code[PATCH_WORD_COUNT] = words;
        Self { code }
    }

    /// Flash word address this loader starts at
    pub fn word_address(&self) -> u16 {
        u16::from_be_bytes([self.code[PATCH_ADDR_HIGH], self.code[PATCH_ADDR_LOW]])
    }

    /// Number of words this loader programs
    pub fn words(&self) -> u8 {
        self.code[PATCH_WORD_COUNT]
    }

    /// Machine code to copy into target RAM
    pub fn as_bytes(&self) -> &[u8] {
        &self.code
    }
}
