//! Run control and register inspection
//!
//! The debug interface has no native register access. Everything here is
//! built from injected instructions that move values through the
//! accumulator and the XDATA scratch byte at 0xF000.

use core::fmt;

use crate::error::Result;
use crate::programmer::DebugLink;
use crate::protocol::{commands, regs, DebugSession, DebugStatus, Instruction};

/// Breakpoint control: arm breakpoint 0
const BP_CTRL_BP0_ENABLE: u8 = 1 << 0;

/// CPU registers of a halted target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterSnapshot {
    /// Program counter
    pub pc: u16,
    /// Accumulator
    pub acc: u8,
    /// B register
    pub b: u8,
    /// Program status word
    pub psw: u8,
    /// Stack pointer
    pub sp: u8,
    /// Data pointer, low byte
    pub dpl: u8,
    /// Data pointer, high byte
    pub dph: u8,
    /// Port 0
    pub p0: u8,
    /// Port 1
    pub p1: u8,
    /// Port 2
    pub p2: u8,
    /// R0-R7 of the active bank
    pub r: [u8; 8],
}

impl RegisterSnapshot {
    /// Data pointer
    pub fn dptr(&self) -> u16 {
        u16::from_be_bytes([self.dph, self.dpl])
    }

    /// Active register bank (PSW.RS1:RS0)
    pub fn bank(&self) -> u8 {
        register_bank(self.psw)
    }
}

impl fmt::Display for RegisterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "PC=0x{:04X} ACC=0x{:02X} B=0x{:02X} PSW=0x{:02X} SP=0x{:02X} DPTR=0x{:04X}",
            self.pc,
            self.acc,
            self.b,
            self.psw,
            self.sp,
            self.dptr()
        )?;
        writeln!(
            f,
            "P0=0x{:02X} P1=0x{:02X} P2=0x{:02X} bank {}",
            self.p0,
            self.p1,
            self.p2,
            self.bank()
        )?;
        for (i, r) in self.r.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "R{}=0x{:02X}", i, r)?;
        }
        Ok(())
    }
}

/// Register bank selected by a PSW value
pub fn register_bank(psw: u8) -> u8 {
    (psw >> regs::PSW_RS_SHIFT) & regs::PSW_RS_MASK
}

impl<L: DebugLink> DebugSession<L> {
    /// Halt the CPU
    ///
    /// The debug-enable handshake is the only documented halt trigger.
    pub fn halt(&mut self) {
        self.enter_debug_mode();
    }

    /// Resume execution from the current program counter
    pub fn resume(&mut self) -> DebugStatus {
        DebugStatus::from_bits_retain(self.command(commands::RESUME))
    }

    /// Execute one instruction at the program counter
    pub fn step(&mut self) -> u8 {
        self.command(commands::STEP_INSTR)
    }

    /// Read a special function register by parking it in scratch RAM
    pub fn read_sfr(&mut self, sfr: u8) -> Result<u8> {
        self.inject(Instruction::MovADirect(sfr));
        self.inject(Instruction::MovDptr(regs::XDATA_SCRATCH));
        self.inject(Instruction::MovxDptrA);
        let mut value = [0u8; 1];
        self.read_xdata(regs::XDATA_SCRATCH, &mut value)?;
        Ok(value[0])
    }

    /// Read the program counter without disturbing execution
    ///
    /// `LCALL` pushes the current PC, which is then fished out of the stack.
    /// The stack pointer is restored and a jump back to the recovered PC
    /// leaves the CPU where it was. R0 of the active bank is used as the
    /// pointer and put back afterwards.
    pub fn read_pc(&mut self) -> Result<u16> {
        let sp = self.read_sfr(regs::SFR_SP)?;
        let r0_addr = register_bank(self.read_sfr(regs::SFR_PSW)?) * 8;
        let r0 = self.inject(Instruction::MovADirect(r0_addr));

        self.inject(Instruction::Lcall(regs::XDATA_SCRATCH));

        // High byte at SP+2, low byte at SP+1
        let mut pc = [0u8; 2];
        for (i, byte) in pc.iter_mut().enumerate() {
            let slot = sp.wrapping_add(2 - i as u8);
            self.inject(Instruction::MovR0Imm(slot));
            self.inject(Instruction::MovAIndirectR0);
            self.inject(Instruction::MovDptr(regs::XDATA_SCRATCH));
            self.inject(Instruction::MovxDptrA);
            let mut value = [0u8; 1];
            self.read_xdata(regs::XDATA_SCRATCH, &mut value)?;
            *byte = value[0];
        }

        self.inject(Instruction::MovDirectImm(regs::SFR_SP, sp));
        self.inject(Instruction::MovDirectImm(r0_addr, r0));
        let pc = u16::from_be_bytes(pc);
        self.inject(Instruction::Ljmp(pc));
        Ok(pc)
    }

    /// Read R0-R7 of the register bank selected in PSW
    pub fn read_register_bank(&mut self) -> Result<[u8; 8]> {
        let bank = register_bank(self.read_sfr(regs::SFR_PSW)?);
        let mut r = [0u8; 8];
        self.read_xdata(u16::from(bank) * 8, &mut r)?;
        Ok(r)
    }

    /// Snapshot the CPU registers
    ///
    /// ACC and DPTR are taken from the accumulator answer before any SFR read
    /// clobbers them, and are written back at the end.
    pub fn read_registers(&mut self) -> Result<RegisterSnapshot> {
        let acc = self.inject(Instruction::Nop);
        let dpl = self.inject(Instruction::MovADirect(regs::SFR_DPL));
        let dph = self.inject(Instruction::MovADirect(regs::SFR_DPH));

        let mut snapshot = RegisterSnapshot {
            acc,
            dpl,
            dph,
            b: self.read_sfr(regs::SFR_B)?,
            psw: self.read_sfr(regs::SFR_PSW)?,
            sp: self.read_sfr(regs::SFR_SP)?,
            p0: self.read_sfr(regs::SFR_P0)?,
            p1: self.read_sfr(regs::SFR_P1)?,
            p2: self.read_sfr(regs::SFR_P2)?,
            ..Default::default()
        };
        snapshot.r = self.read_register_bank()?;
        snapshot.pc = self.read_pc()?;

        self.inject(Instruction::MovDptr(snapshot.dptr()));
        self.inject(Instruction::MovAImm(acc));
        Ok(snapshot)
    }

    /// Arm hardware breakpoint 0 at `address`
    pub fn set_breakpoint(&mut self, address: u16) -> Result<()> {
        self.write_xdata(regs::XDATA_BP0_ADDR, &address.to_le_bytes())?;
        let mut ctrl = [0u8; 1];
        self.read_xdata(regs::XDATA_BP_CTRL, &mut ctrl)?;
        self.write_xdata(regs::XDATA_BP_CTRL, &[ctrl[0] | BP_CTRL_BP0_ENABLE])?;
        log::debug!("breakpoint 0 armed at 0x{:04X}", address);
        Ok(())
    }

    /// Disarm hardware breakpoint 0, leaving its address in place
    pub fn clear_breakpoint(&mut self) -> Result<()> {
        let mut ctrl = [0u8; 1];
        self.read_xdata(regs::XDATA_BP_CTRL, &mut ctrl)?;
        self.write_xdata(regs::XDATA_BP_CTRL, &[ctrl[0] & !BP_CTRL_BP0_ENABLE])
    }
}
