//! ccflasher-dummy - Emulated CC111x/CC253x debug target for testing
//!
//! This crate provides a [`DummyTarget`] that answers the two-wire debug
//! protocol at byte level from in-memory state: flash (with address
//! aliasing past its physical size), the information page, XDATA, internal
//! RAM and SFRs. It executes every injected instruction the core uses, runs
//! the flash loader when resumed at it, and performs the DMA-driven lock
//! byte write. Faults can be injected to exercise timeout and mismatch paths.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::collections::{BTreeMap, VecDeque};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use ccflasher_core::chip::ChipModel;
use ccflasher_core::flash::{FlashLoader, LOADER_LEN};
use ccflasher_core::programmer::DebugLink;
use ccflasher_core::protocol::{commands, regs, DebugStatus};

/// Size of the emulated flash information page
pub const INFO_PAGE_SIZE: usize = 0x800;

/// Flash sizes the emulator accepts
pub const SUPPORTED_FLASH_SIZES: [usize; 6] = [
    8 * 1024,
    16 * 1024,
    32 * 1024,
    64 * 1024,
    128 * 1024,
    256 * 1024,
];

/// Configuration for the emulated target
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Chip id byte returned by GET_CHIP_ID
    pub chip_id: u8,
    /// Revision byte returned by GET_CHIP_ID
    pub revision: u8,
    /// Physical flash size in bytes
    pub flash_size: usize,
    /// Factory IEEE address, mapped at XDATA 0x7FF8
    pub ieee_address: [u8; 8],
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self::for_model(ChipModel::Cc1110)
    }
}

impl DummyConfig {
    /// Configuration for a model at its largest flash size
    pub fn for_model(model: ChipModel) -> Self {
        let chip_id = match model {
            ChipModel::Cc1110 => 0x01,
            ChipModel::Cc1111 => 0x11,
            ChipModel::Cc2530 => 0xA5,
            ChipModel::Cc2531 => 0xB5,
            ChipModel::Unknown(id) => id,
        };
        Self {
            chip_id,
            revision: 0x04,
            flash_size: model.max_flash_size() as usize,
            ieee_address: [0x00, 0x12, 0x4B, 0x00, 0x01, 0x02, 0x03, 0x04],
        }
    }

    /// Override the physical flash size
    pub fn with_flash_size(mut self, size: usize) -> Self {
        self.flash_size = size;
        self
    }
}

/// Injected faults
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// The crystal never reports stable after clock init
    pub clock_never_stable: bool,
    /// Chip erase starts but never reports done
    pub erase_hangs: bool,
    /// The flash loader never reaches its trap instruction
    pub loader_hangs: bool,
    /// Code bytes that always read back a fixed value, by logical address
    pub stuck_bytes: BTreeMap<u32, u8>,
}

/// Counters for what the target has been asked to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    /// Debug-enable handshakes
    pub handshakes: u32,
    /// Plain resets
    pub resets: u32,
    /// Completed flash loader runs
    pub loader_runs: u32,
    /// Injected instructions executed
    pub instructions: u64,
}

/// Emulated debug target
pub struct DummyTarget {
    config: DummyConfig,
    faults: Faults,
    stats: DummyStats,
    flash: Vec<u8>,
    info_page: Vec<u8>,
    xdata: Vec<u8>,
    iram: [u8; 256],
    sfr: [u8; 128],
    pc: u16,
    debug_config: u8,
    halted: bool,
    locked: bool,
    clock_stable: bool,
    erase_done: bool,
    frame: Vec<u8>,
    answers: VecDeque<u8>,
}

impl DummyTarget {
    /// Create a target with erased flash
    pub fn new(config: DummyConfig) -> Self {
        let mut xdata = vec![0u8; 0x1_0000];
        let ieee = regs::XDATA_IEEE_ADDRESS as usize;
        xdata[ieee..ieee + 8].copy_from_slice(&config.ieee_address);
        let flash = vec![0xFF; config.flash_size];
        let mut target = Self {
            config,
            faults: Faults::default(),
            stats: DummyStats::default(),
            flash,
            info_page: vec![0xFF; INFO_PAGE_SIZE],
            xdata,
            iram: [0; 256],
            sfr: [0; 128],
            pc: 0,
            debug_config: 0,
            halted: false,
            locked: false,
            clock_stable: false,
            erase_done: false,
            frame: Vec::with_capacity(4),
            answers: VecDeque::new(),
        };
        target.reset();
        target
    }

    /// Create a target whose flash starts with `image`
    pub fn with_image(config: DummyConfig, image: &[u8]) -> Self {
        let mut target = Self::new(config);
        let len = core::cmp::min(image.len(), target.flash.len());
        target.flash[..len].copy_from_slice(&image[..len]);
        target
    }

    /// Replace the injected faults
    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    /// Make the code byte at `address` always read back `value`
    pub fn set_stuck_byte(&mut self, address: u32, value: u8) {
        self.faults.stuck_bytes.insert(address, value);
    }

    /// Injected faults
    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Counters
    pub fn stats(&self) -> DummyStats {
        self.stats
    }

    /// Physical flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Mutable physical flash contents
    pub fn flash_mut(&mut self) -> &mut [u8] {
        &mut self.flash
    }

    /// Information page contents
    pub fn info_page(&self) -> &[u8] {
        &self.info_page
    }

    /// Internal RAM
    pub fn iram_mut(&mut self) -> &mut [u8; 256] {
        &mut self.iram
    }

    /// Current program counter
    pub fn pc(&self) -> u16 {
        self.pc
    }

    /// Whether the CPU is halted
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Whether debug access is locked
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Read an SFR as the CPU sees it
    pub fn sfr(&self, address: u8) -> u8 {
        self.read_direct(address)
    }

    /// Write an SFR directly, bypassing the debug interface
    pub fn set_sfr(&mut self, address: u8, value: u8) {
        self.sfr[(address & 0x7F) as usize] = value;
    }

    fn reset(&mut self) {
        self.sfr = [0; 128];
        self.set_sfr(regs::SFR_SP, 0x07);
        self.pc = 0;
        self.debug_config = commands::CONFIG_MAIN_PAGE;
        self.clock_stable = false;
        self.erase_done = false;
        // Lock bit 0 of the lock byte is active low
        self.locked = self.info_page[1] & 0x01 == 0;
        self.frame.clear();
        self.answers.clear();
    }

    fn status(&self) -> u8 {
        let mut status = DebugStatus::empty();
        if self.erase_done {
            status |= DebugStatus::CHIP_ERASE_DONE;
        }
        if self.halted {
            status |= DebugStatus::CPU_HALTED | DebugStatus::HALT_STATUS;
        }
        if self.locked {
            status |= DebugStatus::DEBUG_LOCKED;
        }
        if self.clock_stable {
            status |= DebugStatus::OSCILLATOR_STABLE;
        }
        status.bits()
    }

    // =========================================================================
    // Memory model
    // =========================================================================

    fn acc(&self) -> u8 {
        self.read_direct(regs::SFR_ACC)
    }

    fn set_acc(&mut self, value: u8) {
        self.set_sfr(regs::SFR_ACC, value);
    }

    fn dptr(&self) -> u16 {
        u16::from_be_bytes([
            self.read_direct(regs::SFR_DPH),
            self.read_direct(regs::SFR_DPL),
        ])
    }

    fn set_dptr(&mut self, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.set_sfr(regs::SFR_DPH, hi);
        self.set_sfr(regs::SFR_DPL, lo);
    }

    fn r0_address(&self) -> usize {
        let psw = self.read_direct(regs::SFR_PSW);
        (((psw >> regs::PSW_RS_SHIFT) & regs::PSW_RS_MASK) * 8) as usize
    }

    fn read_direct(&self, address: u8) -> u8 {
        if address < 0x80 {
            return self.iram[address as usize];
        }
        match address {
            regs::SFR_SLEEP => {
                if self.clock_stable {
                    regs::SLEEP_XOSC_STB
                } else {
                    0
                }
            }
            // Flash controller is never busy
            regs::SFR_FCTL => 0,
            _ => self.sfr[(address & 0x7F) as usize],
        }
    }

    fn write_direct(&mut self, address: u8, value: u8) {
        if address < 0x80 {
            self.iram[address as usize] = value;
            return;
        }
        self.set_sfr(address, value);
        match address {
            regs::SFR_CLKCON if value == regs::CLKCON_XOSC_FULL_SPEED => {
                self.clock_stable = !self.faults.clock_never_stable;
            }
            regs::SFR_FCTL if value & regs::FCTL_WRITE != 0 => self.flash_controller_write(),
            _ => {}
        }
    }

    /// Logical code address for a CPU-visible one under the current MEMCTR
    fn code_address(&self, virtual_addr: u16) -> u32 {
        if virtual_addr < regs::CODE_UPPER_WINDOW {
            u32::from(virtual_addr)
        } else {
            let bank = u32::from(self.read_direct(regs::SFR_MEMCTR) & 0x07);
            bank * regs::CODE_BANK_SIZE + u32::from(virtual_addr - regs::CODE_UPPER_WINDOW)
        }
    }

    fn read_code(&self, virtual_addr: u16) -> u8 {
        let logical = self.code_address(virtual_addr);
        if let Some(&value) = self.faults.stuck_bytes.get(&logical) {
            return value;
        }
        // Flash smaller than the address space repeats
        self.flash[logical as usize % self.flash.len()]
    }

    fn info_page_selected(&self) -> bool {
        self.debug_config & commands::CONFIG_INFO_PAGE != 0
    }

    fn read_xdata(&self, address: u16) -> u8 {
        let address = address as usize;
        if self.info_page_selected() && address < INFO_PAGE_SIZE {
            self.info_page[address]
        } else if address < self.iram.len() {
            self.iram[address]
        } else {
            self.xdata[address]
        }
    }

    fn write_xdata(&mut self, address: u16, value: u8) {
        let address = address as usize;
        if self.info_page_selected() && address < INFO_PAGE_SIZE {
            log::warn!("dummy: ignoring MOVX write to info page 0x{:04X}", address);
        } else if address < self.iram.len() {
            self.iram[address] = value;
        } else {
            self.xdata[address] = value;
        }
    }

    /// Program bytes from `byte_address` on; flash bits only go from 1 to 0
    fn program(&mut self, byte_address: usize, data: &[u8], info_page: bool) {
        let target = if info_page {
            &mut self.info_page
        } else {
            &mut self.flash
        };
        let len = target.len();
        for (i, &byte) in data.iter().enumerate() {
            target[(byte_address + i) % len] &= byte;
        }
    }

    /// FCTL write started: feed FWDATA from DMA channel 0 if it is armed
    fn flash_controller_write(&mut self) {
        if self.read_direct(regs::SFR_DMAARM) & 0x01 == 0 {
            log::warn!("dummy: flash write started without DMA armed");
            return;
        }
        let desc_addr = u16::from_be_bytes([
            self.read_direct(regs::SFR_DMA0CFGH),
            self.read_direct(regs::SFR_DMA0CFGL),
        ]);
        let desc: Vec<u8> = (0..8)
            .map(|i| self.xdata[desc_addr.wrapping_add(i) as usize])
            .collect();
        let src = u16::from_be_bytes([desc[0], desc[1]]);
        let dst = u16::from_be_bytes([desc[2], desc[3]]);
        let len = usize::from(u16::from_be_bytes([desc[4], desc[5]]));
        if dst != regs::XDATA_FWDATA {
            log::warn!("dummy: DMA destination 0x{:04X} is not FWDATA", dst);
            return;
        }

        let data: Vec<u8> = (0..len)
            .map(|i| self.xdata[src as usize + i])
            .collect();
        let word_address = usize::from(u16::from_be_bytes([
            self.read_direct(regs::SFR_FADDRH),
            self.read_direct(regs::SFR_FADDRL),
        ]));
        let info_page = self.info_page_selected();
        log::debug!(
            "dummy: DMA flash write of {} bytes at word 0x{:04X} ({})",
            len,
            word_address,
            if info_page { "info page" } else { "main" }
        );
        self.program(word_address * 2, &data, info_page);
        self.set_sfr(regs::SFR_DMAARM, 0);
    }

    // =========================================================================
    // Execution
    // =========================================================================

    fn execute(&mut self, code: &[u8]) {
        self.stats.instructions += 1;
        let op = |i: usize| code.get(i).copied().unwrap_or(0);
        match op(0) {
            0x00 => {}
            0x02 => self.pc = u16::from_be_bytes([op(1), op(2)]),
            0x12 => {
                let [hi, lo] = self.pc.to_be_bytes();
                let sp = self.read_direct(regs::SFR_SP);
                self.iram[sp.wrapping_add(1) as usize] = lo;
                self.iram[sp.wrapping_add(2) as usize] = hi;
                self.set_sfr(regs::SFR_SP, sp.wrapping_add(2));
                self.pc = u16::from_be_bytes([op(1), op(2)]);
            }
            0x74 => self.set_acc(op(1)),
            0xE5 => {
                let value = self.read_direct(op(1));
                self.set_acc(value);
            }
            0x75 => self.write_direct(op(1), op(2)),
            0x90 => self.set_dptr(u16::from_be_bytes([op(1), op(2)])),
            0x78 => {
                let r0 = self.r0_address();
                self.iram[r0] = op(1);
            }
            0xE6 => {
                let pointer = self.iram[self.r0_address()];
                self.set_acc(self.iram[pointer as usize]);
            }
            0x93 => {
                let address = self.dptr().wrapping_add(u16::from(self.acc()));
                self.set_acc(self.read_code(address));
            }
            0xE0 => self.set_acc(self.read_xdata(self.dptr())),
            0xF0 => self.write_xdata(self.dptr(), self.acc()),
            0xA3 => self.set_dptr(self.dptr().wrapping_add(1)),
            0xE4 => self.set_acc(0),
            other => log::warn!("dummy: unsupported opcode 0x{:02X}", other),
        }
    }

    /// Decode a flash loader at `address`, if one is there
    fn loader_at(&self, address: u16) -> Option<FlashLoader> {
        let start = address as usize;
        if start + LOADER_LEN > self.xdata.len() {
            return None;
        }
        let code = &self.xdata[start..start + LOADER_LEN];
        let loader = FlashLoader::new(u32::from(u16::from_be_bytes([code[2], code[5]])), code[13]);
        (loader.as_bytes() == code).then_some(loader)
    }

    fn resume(&mut self) {
        if let Some(loader) = self.loader_at(self.pc) {
            if self.faults.loader_hangs {
                log::debug!("dummy: flash loader hangs");
                self.halted = false;
                return;
            }
            // R5 counts down from its start value, so 0 means 256 words
            let words = if loader.words() == 0 {
                256
            } else {
                usize::from(loader.words())
            };
            let scratch = regs::XDATA_SCRATCH as usize;
            let data = self.xdata[scratch..scratch + words * 2].to_vec();
            self.program(usize::from(loader.word_address()) * 2, &data, false);
            self.stats.loader_runs += 1;
            self.pc = self.pc.wrapping_add(LOADER_LEN as u16);
            self.halted = true;
            log::trace!(
                "dummy: loader programmed {} words at word 0x{:04X}",
                words,
                loader.word_address()
            );
            return;
        }

        let bp_ctrl = self.xdata[regs::XDATA_BP_CTRL as usize];
        if bp_ctrl & 0x01 != 0 {
            let bp = regs::XDATA_BP0_ADDR as usize;
            self.pc = u16::from_le_bytes([self.xdata[bp], self.xdata[bp + 1]]);
            self.halted = true;
            log::debug!("dummy: breakpoint 0 hit at 0x{:04X}", self.pc);
        } else {
            self.halted = false;
        }
    }

    fn chip_erase(&mut self) {
        if self.faults.erase_hangs {
            log::debug!("dummy: chip erase hangs");
            self.erase_done = false;
            return;
        }
        self.flash.fill(0xFF);
        self.info_page.fill(0xFF);
        self.locked = false;
        self.erase_done = true;
    }

    fn frame_len(cmd: u8) -> usize {
        match cmd {
            commands::DEBUG_INSTR_1 => 2,
            commands::DEBUG_INSTR_2 => 3,
            commands::DEBUG_INSTR_3 => 4,
            commands::WR_CONFIG => 2,
            _ => 1,
        }
    }

    fn handle_frame(&mut self) {
        let frame = core::mem::take(&mut self.frame);
        match frame[0] {
            commands::DEBUG_INSTR_1 | commands::DEBUG_INSTR_2 | commands::DEBUG_INSTR_3 => {
                if self.locked {
                    self.answers.push_back(0);
                } else {
                    if !self.halted {
                        log::warn!("dummy: instruction injected while running");
                    }
                    self.execute(&frame[1..]);
                    self.answers.push_back(self.acc());
                }
            }
            commands::WR_CONFIG => {
                self.debug_config = frame[1];
                self.answers.push_back(self.status());
            }
            commands::RD_CONFIG => self.answers.push_back(self.debug_config),
            commands::CHIP_ERASE => {
                self.chip_erase();
                self.answers.push_back(self.status());
            }
            commands::READ_STATUS => self.answers.push_back(self.status()),
            commands::RESUME => {
                if !self.locked {
                    self.resume();
                }
                self.answers.push_back(self.status());
            }
            commands::STEP_INSTR => {
                if self.halted && !self.locked {
                    self.pc = self.pc.wrapping_add(1);
                }
                self.answers.push_back(self.acc());
            }
            commands::GET_CHIP_ID => {
                self.answers.push_back(self.config.chip_id);
                self.answers.push_back(self.config.revision);
            }
            other => {
                log::warn!("dummy: unknown debug command 0x{:02X}", other);
                self.answers.push_back(0);
            }
        }
        self.frame = frame;
        self.frame.clear();
    }
}

impl DebugLink for DummyTarget {
    fn send_byte(&mut self, byte: u8) {
        self.frame.push(byte);
        if self.frame.len() == Self::frame_len(self.frame[0]) {
            self.handle_frame();
        }
    }

    fn receive_byte(&mut self) -> u8 {
        // Idle DD floats high
        self.answers.pop_front().unwrap_or(0xFF)
    }

    fn enter_debug_mode(&mut self) {
        self.stats.handshakes += 1;
        self.reset();
        self.halted = true;
    }

    fn pulse_reset(&mut self) {
        self.stats.resets += 1;
        self.reset();
        self.halted = false;
    }

    fn delay_us(&mut self, _us: u32) {
        // No delay needed for in-memory operations
    }
}

fn parse_size(value: &str) -> Result<usize, String> {
    let (digits, scale) = match value.strip_suffix(&['k', 'K'][..]) {
        Some(digits) => (digits, 1024),
        None => (value, 1),
    };
    let parsed = match digits.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    parsed
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .ok_or_else(|| format!("Invalid size value: {}", value))
}

/// Parse programmer options from a list of key-value pairs
///
/// # Supported Options
///
/// - `chip=cc1110|cc1111|cc2530|cc2531` - Emulated model (default cc1110)
/// - `size=N` - Physical flash size in bytes, `0x` hex or `K` suffix accepted
///   (default: the model's largest size)
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyConfig, String> {
    let mut config = DummyConfig::default();
    let mut size = None;

    for (key, value) in options {
        match *key {
            "chip" => {
                let model = match value.to_ascii_lowercase().as_str() {
                    "cc1110" => ChipModel::Cc1110,
                    "cc1111" => ChipModel::Cc1111,
                    "cc2530" => ChipModel::Cc2530,
                    "cc2531" => ChipModel::Cc2531,
                    _ => return Err(format!("Unknown chip: {}", value)),
                };
                config = DummyConfig::for_model(model);
            }
            "size" => size = Some(parse_size(value)?),
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    if let Some(size) = size {
        if !SUPPORTED_FLASH_SIZES.contains(&size) {
            return Err("size must be one of 8K, 16K, 32K, 64K, 128K or 256K".to_string());
        }
        config = config.with_flash_size(size);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccflasher_core::debug::RegisterSnapshot;
    use ccflasher_core::error::{Error, TimeoutKind};
    use ccflasher_core::protocol::{DebugSession, Instruction};
    use std::sync::{Arc, Mutex};

    fn session(config: DummyConfig) -> DebugSession<DummyTarget> {
        let mut session = DebugSession::new(DummyTarget::new(config));
        session.connect();
        session
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
    }

    fn record_progress<L: DebugLink>(session: &mut DebugSession<L>) -> Arc<Mutex<Vec<u8>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        session.set_progress(Some(Box::new(move |p| sink.lock().unwrap().push(p))));
        seen
    }

    #[test]
    fn test_connect_reports_id_and_settles_clock() {
        let mut session = DebugSession::new(DummyTarget::new(DummyConfig::for_model(
            ChipModel::Cc2531,
        )));
        let id = session.connect();
        assert_eq!(id.id, 0xB5);
        assert_eq!(id.model(), ChipModel::Cc2531);
        assert!(session.read_status().contains(DebugStatus::OSCILLATOR_STABLE));
        assert!(session.read_status().is_halted());
    }

    #[test]
    fn test_connect_survives_clock_fault() {
        let target = DummyTarget::new(DummyConfig::default()).with_faults(Faults {
            clock_never_stable: true,
            ..Default::default()
        });
        let mut session = DebugSession::new(target);
        assert_eq!(session.connect().id, 0x01);
        assert_eq!(
            session.clock_init(),
            Err(Error::Timeout(TimeoutKind::ClockInit))
        );
    }

    #[test]
    fn test_write_then_read_back() {
        let mut session = session(DummyConfig::default());
        session.chip_erase().unwrap();

        let image = pattern(1000);
        let progress = record_progress(&mut session);
        session.write_code(0, &image).unwrap();
        assert_eq!(progress.lock().unwrap().last(), Some(&100));
        assert_eq!(&session.link().flash()[..1000], &image[..]);
        // 1000 bytes is 15 full chunks and one of 40 bytes
        assert_eq!(session.link().stats().loader_runs, 16);

        let mut buf = vec![0u8; 1000];
        session.read_code(0, &mut buf).unwrap();
        assert_eq!(buf, image);
        session.verify_code(0, &image).unwrap();
    }

    #[test]
    fn test_write_progress_is_monotonic() {
        let mut session = session(DummyConfig::default());
        let progress = record_progress(&mut session);
        session.write_code(0x100, &pattern(258)).unwrap();

        let seen = progress.lock().unwrap().clone();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));
        assert_eq!(session.link().stats().loader_runs, 5);
    }

    #[test]
    fn test_flash_only_clears_bits() {
        let mut session = session(DummyConfig::default());
        session.write_code(0, &[0xF0, 0x0F]).unwrap();
        session.write_code(0, &[0x3C, 0xFF]).unwrap();
        assert_eq!(&session.link().flash()[..2], &[0x30, 0x0F]);
    }

    #[test]
    fn test_loader_hang_times_out() {
        let mut session = session(DummyConfig::default());
        session.link_mut().faults_mut().loader_hangs = true;
        let progress = record_progress(&mut session);

        let result = session.write_code(0x80, &[0u8; 128]);
        assert_eq!(
            result,
            Err(Error::Timeout(TimeoutKind::FlashWrite { word_address: 0x40 }))
        );
        assert_eq!(progress.lock().unwrap().last(), Some(&0));
    }

    #[test]
    fn test_chip_erase_and_timeout() {
        let mut session = session(DummyConfig::default());
        session.link_mut().flash_mut()[0..4].copy_from_slice(&[1, 2, 3, 4]);
        session.chip_erase().unwrap();
        assert!(session.link().flash().iter().all(|&b| b == 0xFF));

        session.link_mut().faults_mut().erase_hangs = true;
        assert_eq!(
            session.chip_erase(),
            Err(Error::Timeout(TimeoutKind::ChipErase))
        );
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let mut target = DummyTarget::with_image(DummyConfig::default(), &[0xAA; 1024]);
        target.set_stuck_byte(0x200, 0xFF);
        let mut session = DebugSession::new(target);
        session.connect();
        let progress = record_progress(&mut session);

        assert_eq!(
            session.verify_code(0, &[0xAA; 1024]),
            Err(Error::VerifyMismatch {
                address: 0x200,
                expected: 0xAA,
                actual: 0xFF
            })
        );
        assert_eq!(progress.lock().unwrap().last(), Some(&0));
    }

    #[test]
    fn test_read_progress_is_throttled() {
        let mut session = session(DummyConfig::default());
        let progress = record_progress(&mut session);
        let mut buf = vec![0u8; 1024];
        session.read_code(0, &mut buf).unwrap();

        let seen = progress.lock().unwrap().clone();
        assert!(seen.len() <= 1024 / 100 + 1);
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_read_code_across_banks() {
        let config = DummyConfig::for_model(ChipModel::Cc2530);
        let image = pattern(config.flash_size);
        let mut session = DebugSession::new(DummyTarget::with_image(config, &image));
        session.connect();

        let mut buf = vec![0u8; 64];
        session.read_code(0x7FE0, &mut buf).unwrap();
        assert_eq!(buf, &image[0x7FE0..0x8020]);
        session.read_code(0x3_FFC0, &mut buf).unwrap();
        assert_eq!(buf, &image[0x3_FFC0..]);
        assert_eq!(
            session.read_code(0x3_FFC1, &mut buf),
            Err(Error::AddressOutOfBounds)
        );
    }

    #[test]
    fn test_detect_flash_size_by_aliasing() {
        for size in [8 * 1024, 16 * 1024, 32 * 1024] {
            let config = DummyConfig::default().with_flash_size(size);
            let mut session = DebugSession::new(DummyTarget::with_image(config, &pattern(size)));
            session.connect();
            assert_eq!(session.detect_flash_size(), Ok(size as u32));
        }

        // Erased flash falls back to the nominal size for the id
        let mut session = session(DummyConfig::for_model(ChipModel::Cc2530).with_flash_size(8192));
        assert_eq!(session.detect_flash_size(), Ok(256 * 1024));
    }

    #[test]
    fn test_identify_unlocked_cc2530() {
        let config = DummyConfig::for_model(ChipModel::Cc2530).with_flash_size(32 * 1024);
        let ieee = config.ieee_address;
        let mut session = DebugSession::new(DummyTarget::with_image(config, &pattern(32 * 1024)));
        session.connect();

        let identity = session.identify().unwrap();
        assert_eq!(identity.model, ChipModel::Cc2530);
        assert!(!identity.locked);
        // Nominal 256 KiB, no aliasing at 0/8K/16K in a 32 KiB part
        assert_eq!(identity.flash_size, Some(256 * 1024));
        assert_eq!(identity.ieee_address, Some(ieee));
        assert_eq!(identity.info_page, [0xFF; 8]);
    }

    #[test]
    fn test_lock_then_erase() {
        let mut session = session(DummyConfig::default());
        session.set_lock_byte(0x00);
        assert_eq!(&session.link().info_page()[..2], &[0xFF, 0x00]);

        // Lock takes effect after reset
        session.reset_target();
        session.connect();
        assert!(session.link().is_locked());
        let identity = session.identify().unwrap();
        assert!(identity.locked);
        assert_eq!(identity.flash_size, None);
        assert_eq!(identity.ieee_address, None);
        assert!(session.read_status().contains(DebugStatus::DEBUG_LOCKED));

        session.chip_erase().unwrap();
        assert!(!session.link().is_locked());
        assert!(!session.identify().unwrap().locked);
    }

    #[test]
    fn test_read_pc_is_non_destructive() {
        let mut session = session(DummyConfig::default());
        session.set_pc(0x1234);
        session.link_mut().iram_mut()[0] = 0x5A;
        let sp = session.link().sfr(0x81);

        assert_eq!(session.read_pc(), Ok(0x1234));
        assert_eq!(session.link().pc(), 0x1234);
        assert_eq!(session.link().sfr(0x81), sp);
        assert_eq!(session.link_mut().iram_mut()[0], 0x5A);
    }

    #[test]
    fn test_read_sfr_and_register_bank() {
        let mut session = session(DummyConfig::default());
        session.link_mut().set_sfr(0xD0, 0x10);
        for (i, r) in session.link_mut().iram_mut()[16..24].iter_mut().enumerate() {
            *r = 0xA0 + i as u8;
        }

        assert_eq!(session.read_sfr(0xD0), Ok(0x10));
        assert_eq!(
            session.read_register_bank(),
            Ok([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7])
        );
    }

    #[test]
    fn test_read_registers_restores_acc_and_dptr() {
        let mut session = session(DummyConfig::default());
        session.set_pc(0x0300);
        session.inject(Instruction::MovDptr(0xBEEF));
        session.inject(Instruction::MovAImm(0x42));
        session.link_mut().set_sfr(0xF0, 0x99);

        let snapshot: RegisterSnapshot = session.read_registers().unwrap();
        assert_eq!(snapshot.pc, 0x0300);
        assert_eq!(snapshot.acc, 0x42);
        assert_eq!(snapshot.dptr(), 0xBEEF);
        assert_eq!(snapshot.b, 0x99);
        assert_eq!(snapshot.sp, 0x07);

        assert_eq!(session.link().sfr(0xE0), 0x42);
        assert_eq!(session.link().sfr(0x83), 0xBE);
        assert_eq!(session.link().sfr(0x82), 0xEF);
    }

    #[test]
    fn test_breakpoint_halts_resume() {
        let mut session = session(DummyConfig::default());
        session.set_breakpoint(0x0456).unwrap();
        session.resume();
        assert!(session.link().is_halted());
        assert_eq!(session.link().pc(), 0x0456);

        session.clear_breakpoint().unwrap();
        session.resume();
        assert!(!session.link().is_halted());

        session.halt();
        assert!(session.read_status().is_halted());
    }

    #[test]
    fn test_step_advances_pc() {
        let mut session = session(DummyConfig::default());
        session.set_pc(0x0100);
        session.step();
        assert_eq!(session.link().pc(), 0x0101);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("chip", "CC2531"), ("size", "128K")]).unwrap();
        assert_eq!(config.chip_id, 0xB5);
        assert_eq!(config.flash_size, 128 * 1024);

        let config = parse_options(&[("size", "0x4000")]).unwrap();
        assert_eq!(config.chip_id, 0x01);
        assert_eq!(config.flash_size, 16 * 1024);

        assert!(parse_options(&[("chip", "cc2540")]).is_err());
        assert!(parse_options(&[("size", "1000")]).is_err());
    }

    #[test]
    fn test_parse_size_overflow() {
        let huge = format!("{}K", usize::MAX);
        assert_eq!(parse_size(&huge), Err(format!("Invalid size value: {}", huge)));
        assert_eq!(parse_size("8K"), Ok(8192));
        assert!(parse_options(&[("size", huge.as_str())]).is_err());
    }
}
