//! Memory access and flash programming through injected instructions

use crate::error::{Error, Result, TimeoutKind};
use crate::programmer::DebugLink;
use crate::protocol::{commands, regs, DebugSession, DebugStatus, Instruction};

use super::loader::FlashLoader;

/// Bytes of source data handed to one run of the flash loader
pub const FLASH_CHUNK_BYTES: usize = 64;

/// Time allowed for the system clock to settle after clock init
pub const CLOCK_INIT_TIMEOUT_MS: u32 = 200;
/// Time allowed for a full chip erase
pub const CHIP_ERASE_TIMEOUT_MS: u32 = 1_000;
/// Time allowed for one loader run to program its chunk
pub const FLASH_WRITE_TIMEOUT_MS: u32 = 500;

/// Size of the logical code space (8 banks of 32 KiB)
pub const CODE_SPACE_SIZE: u32 = 8 * regs::CODE_BANK_SIZE;
/// End of the region the loader can reach with its 16-bit word address
pub const FLASH_WRITE_LIMIT: u32 = 0x2_0000;
/// Size of the XDATA space
pub const XDATA_SPACE_SIZE: u32 = 0x1_0000;

/// Progress is reported at most once per this many bytes
const PROGRESS_STRIDE: usize = 100;

// =============================================================================
// Bank addressing
// =============================================================================

/// A logical code address split into its 32 KiB bank and the CPU-visible address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankAddress {
    /// Physical bank (`address / 32768`)
    pub bank: u8,
    /// Offset within the bank (`address % 32768`)
    pub offset: u16,
    /// Address the CPU sees: the offset for bank 0, else in the upper window
    pub virtual_addr: u16,
}

impl BankAddress {
    /// Split a logical code address
    pub fn new(address: u32) -> Self {
        let bank = (address / regs::CODE_BANK_SIZE) as u8;
        let offset = (address % regs::CODE_BANK_SIZE) as u16;
        let virtual_addr = if bank == 0 {
            offset
        } else {
            regs::CODE_UPPER_WINDOW + offset
        };
        Self {
            bank,
            offset,
            virtual_addr,
        }
    }

    /// MEMCTR value that makes this address visible
    ///
    /// Bank 0 is always mapped low; bank 1 is put in the upper window so the
    /// window is never left undefined.
    pub fn memctr(&self) -> u8 {
        if self.bank == 0 {
            regs::MEMCTR_BANK1
        } else {
            self.bank
        }
    }

    /// Bytes left in this bank from this address on
    pub fn remaining_in_bank(&self) -> usize {
        (regs::CODE_BANK_SIZE - u32::from(self.offset)) as usize
    }
}

// =============================================================================
// Flash write chunking
// =============================================================================

/// One loader run of a flash write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashChunk {
    /// Offset of the chunk in the source buffer
    pub offset: usize,
    /// Flash word address the chunk is programmed at
    pub word_address: u32,
    /// Number of 16-bit words in the chunk
    pub words: u8,
}

impl FlashChunk {
    /// Number of source bytes in the chunk
    pub fn len(&self) -> usize {
        usize::from(self.words) * 2
    }

    /// Whether the chunk carries no data
    pub fn is_empty(&self) -> bool {
        self.words == 0
    }
}

/// Iterator over the loader runs needed to program `len` bytes at `address`
#[derive(Debug, Clone)]
pub struct FlashChunks {
    word_address: u32,
    offset: usize,
    remaining: usize,
}

impl Iterator for FlashChunks {
    type Item = FlashChunk;

    fn next(&mut self) -> Option<FlashChunk> {
        if self.remaining == 0 {
            return None;
        }
        let bytes = self.remaining.min(FLASH_CHUNK_BYTES);
        let chunk = FlashChunk {
            offset: self.offset,
            word_address: self.word_address,
            words: (bytes / 2) as u8,
        };
        self.word_address += u32::from(chunk.words);
        self.offset += chunk.len();
        self.remaining -= chunk.len();
        Some(chunk)
    }
}

/// Split a flash write into loader runs
///
/// `address` and `len` must both be even.
pub fn flash_chunks(address: u32, len: usize) -> FlashChunks {
    FlashChunks {
        word_address: address / 2,
        offset: 0,
        remaining: len,
    }
}

// =============================================================================
// Session operations
// =============================================================================

fn check_code_range(address: u32, len: usize, limit: u32) -> Result<()> {
    match address.checked_add(len as u32) {
        Some(end) if len as u64 <= u64::from(limit) && end <= limit => Ok(()),
        _ => Err(Error::AddressOutOfBounds),
    }
}

fn check_xdata_range(address: u16, len: usize) -> Result<()> {
    if u32::from(address) + len as u32 > XDATA_SPACE_SIZE || len as u64 > u64::from(XDATA_SPACE_SIZE)
    {
        return Err(Error::AddressOutOfBounds);
    }
    Ok(())
}

impl<L: DebugLink> DebugSession<L> {
    /// Make the bank holding `address` visible and point DPTR at it
    fn select_code_address(&mut self, address: BankAddress) {
        self.inject(Instruction::MovDirectImm(regs::SFR_MEMCTR, address.memctr()));
        self.inject(Instruction::MovDptr(address.virtual_addr));
    }

    /// Fetch code bytes from `address` on, handing each to `visit`
    ///
    /// Progress is reported at most every ~100 bytes, 100 at the end, and 0
    /// if `visit` fails.
    fn scan_code<F>(&mut self, address: u32, len: usize, mut visit: F) -> Result<()>
    where
        F: FnMut(usize, u8) -> Result<()>,
    {
        check_code_range(address, len, CODE_SPACE_SIZE)?;

        let mut pos = 0;
        let mut last_report = 0;
        while pos < len {
            let bank = BankAddress::new(address + pos as u32);
            let run = bank.remaining_in_bank().min(len - pos);
            self.select_code_address(bank);

            for _ in 0..run {
                self.inject(Instruction::ClrA);
                let byte = self.inject(Instruction::MovcADptr);
                if let Err(e) = visit(pos, byte) {
                    self.report_progress(0);
                    return Err(e);
                }
                self.inject(Instruction::IncDptr);

                if pos - last_report > PROGRESS_STRIDE {
                    last_report = pos;
                    self.report_progress((pos * 100 / len) as u8);
                }
                pos += 1;
            }
        }

        self.report_progress(100);
        Ok(())
    }

    /// Read code memory from a logical address (up to 256 KiB space)
    pub fn read_code(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.scan_code(address, buf.len(), |i, byte| {
            buf[i] = byte;
            Ok(())
        })
    }

    /// Compare code memory against `expected`
    ///
    /// Stops at the first difference, which is returned as
    /// [`Error::VerifyMismatch`] with its absolute address.
    pub fn verify_code(&mut self, address: u32, expected: &[u8]) -> Result<()> {
        self.scan_code(address, expected.len(), |i, actual| {
            if actual == expected[i] {
                Ok(())
            } else {
                Err(Error::VerifyMismatch {
                    address: address + i as u32,
                    expected: expected[i],
                    actual,
                })
            }
        })
    }

    /// Read XDATA memory
    pub fn read_xdata(&mut self, address: u16, buf: &mut [u8]) -> Result<()> {
        check_xdata_range(address, buf.len())?;
        self.inject(Instruction::MovDptr(address));
        for byte in buf.iter_mut() {
            *byte = self.inject(Instruction::MovxADptr);
            self.inject(Instruction::IncDptr);
        }
        Ok(())
    }

    /// Write XDATA memory
    pub fn write_xdata(&mut self, address: u16, data: &[u8]) -> Result<()> {
        check_xdata_range(address, data.len())?;
        self.inject(Instruction::MovDptr(address));
        for &byte in data {
            self.inject(Instruction::MovAImm(byte));
            self.inject(Instruction::MovxDptrA);
            self.inject(Instruction::IncDptr);
        }
        Ok(())
    }

    /// Set the program counter
    pub fn set_pc(&mut self, address: u16) {
        self.inject(Instruction::Ljmp(address));
    }

    /// Switch the system clock to the crystal and wait for it to settle
    pub fn clock_init(&mut self) -> Result<()> {
        self.inject(Instruction::MovDirectImm(
            regs::SFR_CLKCON,
            regs::CLKCON_XOSC_FULL_SPEED,
        ));
        let stable = self.poll_until(CLOCK_INIT_TIMEOUT_MS, |s| {
            s.inject(Instruction::MovADirect(regs::SFR_SLEEP)) & regs::SLEEP_XOSC_STB != 0
        });
        if stable {
            Ok(())
        } else {
            Err(Error::Timeout(TimeoutKind::ClockInit))
        }
    }

    /// Erase all of flash, lock bits included
    pub fn chip_erase(&mut self) -> Result<()> {
        self.inject(Instruction::Nop);
        self.command(commands::CHIP_ERASE);
        let done = self.poll_until(CHIP_ERASE_TIMEOUT_MS, |s| {
            s.read_status().contains(DebugStatus::CHIP_ERASE_DONE)
        });
        if done {
            log::debug!("chip erase complete");
            Ok(())
        } else {
            Err(Error::Timeout(TimeoutKind::ChipErase))
        }
    }

    /// Program flash from an even byte address
    ///
    /// Flash is written in 16-bit words: both `address` and `data.len()` must
    /// be even. The region must have been erased first. Each 64-byte chunk is
    /// staged in scratch RAM and programmed by the loader; a chunk that does
    /// not finish in time aborts the write, leaving earlier chunks in place.
    pub fn write_code(&mut self, address: u32, data: &[u8]) -> Result<()> {
        if address % 2 != 0 || data.len() % 2 != 0 {
            return Err(Error::InvalidAlignment);
        }
        check_code_range(address, data.len(), FLASH_WRITE_LIMIT)?;

        let total = data.len();
        let mut written = 0;
        for chunk in flash_chunks(address, total) {
            let loader = FlashLoader::new(chunk.word_address, chunk.words);
            let source = &data[chunk.offset..chunk.offset + chunk.len()];
            log::trace!(
                "flash write: {} words at word address 0x{:05X}",
                chunk.words,
                chunk.word_address
            );

            self.write_xdata(regs::XDATA_SCRATCH, source)?;
            self.write_xdata(regs::XDATA_LOADER, loader.as_bytes())?;
            self.inject(Instruction::MovDirectImm(
                regs::SFR_MEMCTR,
                regs::MEMCTR_FLASH_WRITE,
            ));
            self.set_pc(regs::XDATA_LOADER);
            self.command(commands::RESUME);

            let halted = self.poll_until(FLASH_WRITE_TIMEOUT_MS, |s| {
                s.read_status().contains(DebugStatus::HALT_STATUS)
            });
            if !halted {
                self.report_progress(0);
                return Err(Error::Timeout(TimeoutKind::FlashWrite {
                    word_address: chunk.word_address,
                }));
            }

            written += chunk.len();
            self.report_progress((written * 100 / total) as u8);
        }

        self.report_progress(100);
        Ok(())
    }
}
