//! Typed 8051 instructions for injection
//!
//! The debug interface can execute any single 8051 instruction of one to three
//! bytes and hands back the accumulator afterwards. Everything the host does
//! to memory and registers is built from the handful of instructions below.

use core::fmt;

/// An 8051 instruction that can be injected through the debug interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `NOP`
    Nop,
    /// `LJMP addr16`
    Ljmp(u16),
    /// `LCALL addr16`
    Lcall(u16),
    /// `MOV A, #data`
    MovAImm(u8),
    /// `MOV A, direct`
    MovADirect(u8),
    /// `MOV direct, #data`
    MovDirectImm(u8, u8),
    /// `MOV DPTR, #data16`
    MovDptr(u16),
    /// `MOV R0, #data`
    MovR0Imm(u8),
    /// `MOV A, @R0`
    MovAIndirectR0,
    /// `MOVC A, @A+DPTR`
    MovcADptr,
    /// `MOVX A, @DPTR`
    MovxADptr,
    /// `MOVX @DPTR, A`
    MovxDptrA,
    /// `INC DPTR`
    IncDptr,
    /// `CLR A`
    ClrA,
}

/// Machine code of one instruction, 1 to 3 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    bytes: [u8; 3],
    len: usize,
}

impl Encoded {
    fn one(op: u8) -> Self {
        Self {
            bytes: [op, 0, 0],
            len: 1,
        }
    }

    fn two(op: u8, a: u8) -> Self {
        Self {
            bytes: [op, a, 0],
            len: 2,
        }
    }

    fn three(op: u8, a: u8, b: u8) -> Self {
        Self {
            bytes: [op, a, b],
            len: 3,
        }
    }

    /// The encoded bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Instruction {
    /// Opcode of this instruction
    pub fn opcode(&self) -> u8 {
        self.encode().bytes[0]
    }

    /// Encode to machine code
    pub fn encode(&self) -> Encoded {
        match *self {
            Self::Nop => Encoded::one(0x00),
            Self::Ljmp(addr) => Encoded::three(0x02, (addr >> 8) as u8, addr as u8),
            Self::Lcall(addr) => Encoded::three(0x12, (addr >> 8) as u8, addr as u8),
            Self::MovAImm(data) => Encoded::two(0x74, data),
            Self::MovADirect(direct) => Encoded::two(0xE5, direct),
            Self::MovDirectImm(direct, data) => Encoded::three(0x75, direct, data),
            Self::MovDptr(value) => Encoded::three(0x90, (value >> 8) as u8, value as u8),
            Self::MovR0Imm(data) => Encoded::two(0x78, data),
            Self::MovAIndirectR0 => Encoded::one(0xE6),
            Self::MovcADptr => Encoded::one(0x93),
            Self::MovxADptr => Encoded::one(0xE0),
            Self::MovxDptrA => Encoded::one(0xF0),
            Self::IncDptr => Encoded::one(0xA3),
            Self::ClrA => Encoded::one(0xE4),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => write!(f, "NOP"),
            Self::Ljmp(addr) => write!(f, "LJMP 0x{:04X}", addr),
            Self::Lcall(addr) => write!(f, "LCALL 0x{:04X}", addr),
            Self::MovAImm(data) => write!(f, "MOV A, #0x{:02X}", data),
            Self::MovADirect(direct) => write!(f, "MOV A, 0x{:02X}", direct),
            Self::MovDirectImm(direct, data) => write!(f, "MOV 0x{:02X}, #0x{:02X}", direct, data),
            Self::MovDptr(value) => write!(f, "MOV DPTR, #0x{:04X}", value),
            Self::MovR0Imm(data) => write!(f, "MOV R0, #0x{:02X}", data),
            Self::MovAIndirectR0 => write!(f, "MOV A, @R0"),
            Self::MovcADptr => write!(f, "MOVC A, @A+DPTR"),
            Self::MovxADptr => write!(f, "MOVX A, @DPTR"),
            Self::MovxDptrA => write!(f, "MOVX @DPTR, A"),
            Self::IncDptr => write!(f, "INC DPTR"),
            Self::ClrA => write!(f, "CLR A"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_lengths() {
        assert_eq!(Instruction::Nop.encode().as_slice(), &[0x00]);
        assert_eq!(Instruction::MovAImm(0x5A).encode().as_slice(), &[0x74, 0x5A]);
        assert_eq!(
            Instruction::MovDirectImm(0xC7, 0x03).encode().as_slice(),
            &[0x75, 0xC7, 0x03]
        );
    }

    #[test]
    fn test_sixteen_bit_operands_are_big_endian() {
        assert_eq!(
            Instruction::MovDptr(0xF100).encode().as_slice(),
            &[0x90, 0xF1, 0x00]
        );
        assert_eq!(
            Instruction::Ljmp(0x1234).encode().as_slice(),
            &[0x02, 0x12, 0x34]
        );
        assert_eq!(
            Instruction::Lcall(0xF000).encode().as_slice(),
            &[0x12, 0xF0, 0x00]
        );
    }

    #[test]
    fn test_opcode() {
        assert_eq!(Instruction::MovcADptr.opcode(), 0x93);
        assert_eq!(Instruction::MovR0Imm(9).opcode(), 0x78);
    }
}
