//! Target register and memory map constants (CC111x / CC253x)

// ============================================================================
// Special function registers
// ============================================================================

/// Port 0
pub const SFR_P0: u8 = 0x80;
/// Stack pointer
pub const SFR_SP: u8 = 0x81;
/// Data pointer low byte
pub const SFR_DPL: u8 = 0x82;
/// Data pointer high byte
pub const SFR_DPH: u8 = 0x83;
/// Port 1
pub const SFR_P1: u8 = 0x90;
/// Data pointer select
pub const SFR_DPS: u8 = 0x92;
/// Port 2
pub const SFR_P2: u8 = 0xA0;
/// Flash write timing
pub const SFR_FWT: u8 = 0xAB;
/// Flash word address, low byte
pub const SFR_FADDRL: u8 = 0xAC;
/// Flash word address, high byte
pub const SFR_FADDRH: u8 = 0xAD;
/// Flash controller control
pub const SFR_FCTL: u8 = 0xAE;
/// Flash write data
pub const SFR_FWDATA: u8 = 0xAF;
/// Sleep mode control / oscillator status
pub const SFR_SLEEP: u8 = 0xBE;
/// Clock control
pub const SFR_CLKCON: u8 = 0xC6;
/// Memory arbiter control (code bank window)
pub const SFR_MEMCTR: u8 = 0xC7;
/// Program status word
pub const SFR_PSW: u8 = 0xD0;
/// DMA channel 0 configuration address, low byte
pub const SFR_DMA0CFGL: u8 = 0xD4;
/// DMA channel 0 configuration address, high byte
pub const SFR_DMA0CFGH: u8 = 0xD5;
/// DMA channel arm
pub const SFR_DMAARM: u8 = 0xD6;
/// Accumulator
pub const SFR_ACC: u8 = 0xE0;
/// B register
pub const SFR_B: u8 = 0xF0;

// ============================================================================
// Register bits and values
// ============================================================================

/// SLEEP: high-speed crystal oscillator stable
pub const SLEEP_XOSC_STB: u8 = 1 << 6;
/// CLKCON value selecting the crystal as system clock at full speed
pub const CLKCON_XOSC_FULL_SPEED: u8 = 0x00;
/// FCTL: start a flash write sequence
pub const FCTL_WRITE: u8 = 0x02;
/// Bit address of ACC.6, which holds FCTL.BUSY after `MOV A, FCTL`
pub const BIT_ACC_6: u8 = 0xE6;
/// PSW: register bank select field shift
pub const PSW_RS_SHIFT: u8 = 3;
/// PSW: register bank select field mask (after shifting)
pub const PSW_RS_MASK: u8 = 0x03;
/// MEMCTR: map physical bank 1 into the upper code window
pub const MEMCTR_BANK1: u8 = 0x01;
/// MEMCTR: window used while the flash loader programs flash
pub const MEMCTR_FLASH_WRITE: u8 = 0x51;
/// FWT value programmed before a DMA-driven info page write
pub const FWT_INFO_PAGE: u8 = 0x23;

// ============================================================================
// XDATA map
// ============================================================================

/// Scratch RAM: source buffer for flash writes and parking spot for SFR reads
pub const XDATA_SCRATCH: u16 = 0xF000;
/// Where the flash loader is copied to and executed from
pub const XDATA_LOADER: u16 = 0xF100;
/// DMA descriptor used by the lock byte write
pub const XDATA_DMA_DESCRIPTOR: u16 = 0xF800;
/// XDATA alias of FWDATA, the DMA destination for flash writes
pub const XDATA_FWDATA: u16 = 0xDFAF;
/// Breakpoint 0 address, low byte (high byte follows)
pub const XDATA_BP0_ADDR: u16 = 0xC760;
/// Breakpoint control register, bit 0 arms breakpoint 0
pub const XDATA_BP_CTRL: u16 = 0xC768;
/// IEEE address on CC253x parts
pub const XDATA_IEEE_ADDRESS: u16 = 0x7FF8;

/// Size of one code bank window
pub const CODE_BANK_SIZE: u32 = 0x8000;
/// Upper code window where banks 1.. appear
pub const CODE_UPPER_WINDOW: u16 = 0x8000;
