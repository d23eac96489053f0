//! Lock byte programming
//!
//! The lock bits live in the flash information page. They are written by a
//! sequence of injected instructions that stages the data and a DMA
//! descriptor in scratch RAM, then lets DMA channel 0 feed `FWDATA` while the
//! flash controller runs a write at word address 0 of the info page.

use alloc::vec::Vec;

use crate::programmer::DebugLink;
use crate::protocol::{commands, regs, DebugSession, Instruction};

/// Lock bits occupy the low five bits of the lock byte
pub const LOCK_BYTE_MASK: u8 = 0x1F;

/// DMA descriptor: 2 bytes from scratch RAM to `FWDATA`, triggered by the
/// flash controller
#[rustfmt::skip]
pub const LOCK_DMA_DESCRIPTOR: [u8; 8] = [
    (regs::XDATA_SCRATCH >> 8) as u8, regs::XDATA_SCRATCH as u8,
    (regs::XDATA_FWDATA >> 8) as u8, regs::XDATA_FWDATA as u8,
    0x00, 0x02,
    0x12, 0x4A,
];

/// Save DPS, select DPTR0 and touch DPH/DPL before staging data
const STAGE_PROLOGUE: [Instruction; 4] = [
    Instruction::MovADirect(regs::SFR_DPS),
    Instruction::MovDirectImm(regs::SFR_DPS, 0x00),
    Instruction::MovADirect(regs::SFR_DPH),
    Instruction::MovADirect(regs::SFR_DPL),
];

/// Clear DPTR0 and the accumulator after staging data
const STAGE_EPILOGUE: [Instruction; 4] = [
    Instruction::MovDptr(0x0000),
    Instruction::MovDirectImm(regs::SFR_DPS, 0x00),
    Instruction::MovAImm(0x00),
    Instruction::Nop,
];

fn stage_bytes(out: &mut Vec<Instruction>, address: u16, bytes: &[u8]) {
    out.extend_from_slice(&STAGE_PROLOGUE);
    out.push(Instruction::MovDptr(address));
    for &b in bytes {
        out.push(Instruction::MovAImm(b));
        out.push(Instruction::MovxDptrA);
        out.push(Instruction::IncDptr);
    }
    out.extend_from_slice(&STAGE_EPILOGUE);
}

/// Instructions that program `lock_byte` into the info page
///
/// Expects the info page to be selected with `WR_CONFIG` beforehand. The
/// lock byte is masked to its five valid bits.
pub fn lock_sequence(lock_byte: u8) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(96);

    // Data: erased filler word half, then the lock byte
    stage_bytes(&mut out, regs::XDATA_SCRATCH, &[0xFF, lock_byte & LOCK_BYTE_MASK]);
    // DMA descriptor for channel 0
    stage_bytes(&mut out, regs::XDATA_DMA_DESCRIPTOR, &LOCK_DMA_DESCRIPTOR);

    // Arm DMA and start the write at word address 0
    out.extend_from_slice(&[
        Instruction::MovADirect(regs::SFR_CLKCON),
        Instruction::MovAImm(0x00),
        Instruction::MovDirectImm(regs::SFR_FWT, regs::FWT_INFO_PAGE),
        Instruction::MovDirectImm(
            regs::SFR_DMA0CFGH,
            (regs::XDATA_DMA_DESCRIPTOR >> 8) as u8,
        ),
        Instruction::MovDirectImm(regs::SFR_DMA0CFGL, regs::XDATA_DMA_DESCRIPTOR as u8),
        Instruction::MovDirectImm(regs::SFR_DMAARM, 0x01),
        Instruction::MovDirectImm(regs::SFR_FADDRH, 0x00),
        Instruction::MovDirectImm(regs::SFR_FADDRL, 0x00),
        Instruction::MovDirectImm(regs::SFR_FCTL, regs::FCTL_WRITE),
        Instruction::Nop,
        Instruction::MovADirect(regs::SFR_FCTL),
        Instruction::MovAImm(0x00),
    ]);
    out
}

impl<L: DebugLink> DebugSession<L> {
    /// Program the lock byte
    ///
    /// A lock byte of 0 enables read protection; only a chip erase clears it.
    /// Returns the answer to the final `WR_CONFIG`.
    pub fn set_lock_byte(&mut self, lock_byte: u8) -> u8 {
        log::debug!("writing lock byte 0x{:02X}", lock_byte & LOCK_BYTE_MASK);
        self.write_config(commands::CONFIG_INFO_PAGE);
        self.inject(Instruction::Nop);
        for instruction in lock_sequence(lock_byte) {
            self.inject(instruction);
        }
        self.write_config(commands::CONFIG_MAIN_PAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLink;

    #[test]
    fn test_lock_byte_is_masked() {
        let seq = lock_sequence(0xFF);
        assert_eq!(seq[4], Instruction::MovDptr(0xF000));
        assert_eq!(seq[5], Instruction::MovAImm(0xFF));
        assert_eq!(seq[8], Instruction::MovAImm(0x1F));
    }

    #[test]
    fn test_descriptor_points_at_scratch_and_fwdata() {
        assert_eq!(LOCK_DMA_DESCRIPTOR, [0xF0, 0x00, 0xDF, 0xAF, 0x00, 0x02, 0x12, 0x4A]);
    }

    #[test]
    fn test_write_is_triggered_last() {
        let seq = lock_sequence(0);
        let arm = seq
            .iter()
            .position(|i| *i == Instruction::MovDirectImm(0xD6, 0x01))
            .unwrap();
        let go = seq
            .iter()
            .position(|i| *i == Instruction::MovDirectImm(0xAE, 0x02))
            .unwrap();
        assert!(arm < go);
        // Both staging buffers are written before DMA is armed
        let last_store = seq.iter().rposition(|i| *i == Instruction::MovxDptrA).unwrap();
        assert!(last_store < arm);
    }

    #[test]
    fn test_set_lock_byte_switches_pages() {
        let mut session = DebugSession::new(ScriptedLink::default());
        session.set_lock_byte(0);
        let sent = &session.link().sent;
        assert_eq!(&sent[..2], &[0x1D, 0x01]);
        assert_eq!(&sent[sent.len() - 2..], &[0x1D, 0x00]);
    }
}
