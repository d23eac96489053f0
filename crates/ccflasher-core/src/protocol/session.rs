//! Debug session: command framing over a [`DebugLink`]
//!
//! [`DebugSession`] is the single owner of a link. The higher level
//! operations (memory access, flash programming, chip identification, run
//! control) are implemented on it in their own modules; this module only
//! holds the framing primitives they are all built from.

use alloc::boxed::Box;

use super::commands::{self, DebugStatus};
use super::instruction::Instruction;
use crate::chip::ChipId;
use crate::error::{Error, Result};
use crate::programmer::DebugLink;

/// Progress callback, receives a percentage in `0..=100`
///
/// Must not block; it runs on whatever thread drives the session.
pub type ProgressFn = Box<dyn FnMut(u8) + Send>;

/// Interval between polls of a status bit
pub(crate) const POLL_INTERVAL_US: u32 = 1_000;

/// A debug session with one target
pub struct DebugSession<L> {
    link: L,
    progress: Option<ProgressFn>,
}

impl<L: DebugLink> DebugSession<L> {
    /// Create a session on an already opened link
    pub fn new(link: L) -> Self {
        Self {
            link,
            progress: None,
        }
    }

    /// Borrow the link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Give the link back
    pub fn into_inner(self) -> L {
        self.link
    }

    /// Install (or with `None`, remove) the progress callback
    ///
    /// Only one callback is active at a time; the previous one is returned.
    pub fn set_progress(&mut self, callback: Option<ProgressFn>) -> Option<ProgressFn> {
        core::mem::replace(&mut self.progress, callback)
    }

    /// Whether a progress callback is installed
    pub fn has_progress(&self) -> bool {
        self.progress.is_some()
    }

    pub(crate) fn report_progress(&mut self, percent: u8) {
        if let Some(callback) = self.progress.as_mut() {
            callback(percent.min(100));
        }
    }

    /// Send a bare command byte and return its one-byte answer
    pub fn command(&mut self, cmd: u8) -> u8 {
        self.link.send_byte(cmd);
        self.link.receive_byte()
    }

    /// Send a command byte with one argument and return its one-byte answer
    pub fn command_with_arg(&mut self, cmd: u8, arg: u8) -> u8 {
        self.link.send_byte(cmd);
        self.link.send_byte(arg);
        self.link.receive_byte()
    }

    /// Execute one instruction on the target, returning the accumulator
    pub fn inject(&mut self, instruction: Instruction) -> u8 {
        let encoded = instruction.encode();
        self.send_instruction(encoded.as_slice())
    }

    /// Execute raw machine code of 1 to 3 bytes, returning the accumulator
    pub fn inject_raw(&mut self, bytes: &[u8]) -> Result<u8> {
        if bytes.is_empty() || bytes.len() > 3 {
            return Err(Error::InvalidInstruction);
        }
        Ok(self.send_instruction(bytes))
    }

    fn send_instruction(&mut self, bytes: &[u8]) -> u8 {
        let cmd = match bytes.len() {
            1 => commands::DEBUG_INSTR_1,
            2 => commands::DEBUG_INSTR_2,
            _ => commands::DEBUG_INSTR_3,
        };
        self.link.send_byte(cmd);
        for &b in bytes {
            self.link.send_byte(b);
        }
        self.link.receive_byte()
    }

    /// Write the debug configuration byte
    pub fn write_config(&mut self, config: u8) -> u8 {
        self.command_with_arg(commands::WR_CONFIG, config)
    }

    /// Read the debug configuration byte
    pub fn read_config(&mut self) -> u8 {
        self.command(commands::RD_CONFIG)
    }

    /// Read the debug status byte
    pub fn read_status(&mut self) -> DebugStatus {
        DebugStatus::from_bits_retain(self.command(commands::READ_STATUS))
    }

    /// Read the chip id and revision
    pub fn chip_id(&mut self) -> ChipId {
        self.link.send_byte(commands::GET_CHIP_ID);
        let id = self.link.receive_byte();
        let revision = self.link.receive_byte();
        ChipId { id, revision }
    }

    /// Run the debug-enable handshake (halts the CPU)
    pub fn enter_debug_mode(&mut self) {
        self.link.enter_debug_mode();
    }

    /// Reset the target so it boots its firmware normally
    pub fn reset_target(&mut self) {
        self.link.pulse_reset();
    }

    /// Put the target into debug mode and identify it
    ///
    /// A clock-init timeout is logged and otherwise ignored so the id is still
    /// reported for locked or unclocked parts.
    pub fn connect(&mut self) -> ChipId {
        self.enter_debug_mode();
        let id = self.chip_id();
        self.inject(Instruction::Nop);
        if let Err(e) = self.clock_init() {
            log::warn!("connect: {}", e);
        }
        log::debug!(
            "connect: chip id 0x{:02X} rev 0x{:02X}",
            id.id,
            id.revision
        );
        id
    }

    /// Poll `done` every millisecond until it returns true or `timeout_ms` passes
    ///
    /// The budget counts delays between polls, not wall time, so the timeout
    /// is a lower bound: each poll also pays for its own wire traffic.
    /// Returns whether the condition was met.
    pub(crate) fn poll_until<F>(&mut self, timeout_ms: u32, mut done: F) -> bool
    where
        F: FnMut(&mut Self) -> bool,
    {
        let max_polls = (timeout_ms * 1_000 / POLL_INTERVAL_US).max(1);
        for _ in 0..max_polls {
            if done(self) {
                return true;
            }
            self.link.delay_us(POLL_INTERVAL_US);
        }
        done(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLink;

    #[test]
    fn test_inject_framing() {
        let mut session = DebugSession::new(ScriptedLink::default());
        session.link_mut().answers.extend([0x11, 0x22, 0x33]);

        assert_eq!(session.inject(Instruction::Nop), 0x11);
        assert_eq!(session.inject(Instruction::MovAImm(0x42)), 0x22);
        assert_eq!(session.inject(Instruction::MovDptr(0xF000)), 0x33);
        assert_eq!(
            session.link().sent,
            [0x55, 0x00, 0x56, 0x74, 0x42, 0x57, 0x90, 0xF0, 0x00]
        );
    }

    #[test]
    fn test_inject_raw_rejects_bad_lengths() {
        let mut session = DebugSession::new(ScriptedLink::default());
        assert_eq!(session.inject_raw(&[]), Err(Error::InvalidInstruction));
        assert_eq!(
            session.inject_raw(&[0, 0, 0, 0]),
            Err(Error::InvalidInstruction)
        );
        assert!(session.link().sent.is_empty());
        assert_eq!(session.inject_raw(&[0xA3]), Ok(0));
    }

    #[test]
    fn test_chip_id_reads_two_bytes() {
        let mut session = DebugSession::new(ScriptedLink::default());
        session.link_mut().answers.extend([0xA5, 0x21]);
        let id = session.chip_id();
        assert_eq!(id, ChipId { id: 0xA5, revision: 0x21 });
        assert_eq!(session.link().sent, [0x68]);
    }

    #[test]
    fn test_connect_handshakes_once() {
        let mut session = DebugSession::new(ScriptedLink::default());
        // chip id, NOP, CLKCON write, SLEEP read with the crystal stable
        session
            .link_mut()
            .answers
            .extend([0x01, 0x04, 0x00, 0x00, crate::protocol::regs::SLEEP_XOSC_STB]);

        let id = session.connect();
        assert_eq!(id, ChipId { id: 0x01, revision: 0x04 });
        assert_eq!(session.link().handshakes, 1);
        assert_eq!(session.link().sent[..3], [0x68, 0x55, 0x00]);
        assert_eq!(session.link().delays, 0);

        session.reset_target();
        assert_eq!(session.link().handshakes, 1);
    }

    #[test]
    fn test_config_and_status_framing() {
        let mut session = DebugSession::new(ScriptedLink::default());
        session.link_mut().answers.extend([0x00, 0x01, 0xA0]);
        session.write_config(0x01);
        session.read_config();
        let status = session.read_status();
        assert!(status.is_halted());
        assert!(status.contains(DebugStatus::CHIP_ERASE_DONE));
        assert_eq!(session.link().sent, [0x1D, 0x01, 0x24, 0x34]);
    }

    #[test]
    fn test_poll_until_gives_up() {
        let mut session = DebugSession::new(ScriptedLink::default());
        let mut calls = 0u32;
        let met = session.poll_until(5, |_| {
            calls += 1;
            false
        });
        assert!(!met);
        assert_eq!(calls, 6);
        assert_eq!(session.link().delays, 5);
    }

    #[test]
    fn test_progress_callback_is_replaced() {
        use alloc::sync::Arc;
        use core::sync::atomic::{AtomicU8, Ordering};

        let seen = Arc::new(AtomicU8::new(0));
        let mut session = DebugSession::new(ScriptedLink::default());
        let sink = seen.clone();
        assert!(session
            .set_progress(Some(Box::new(move |p| sink.store(p, Ordering::SeqCst))))
            .is_none());
        session.report_progress(150);
        assert_eq!(seen.load(Ordering::SeqCst), 100);

        assert!(session.set_progress(None).is_some());
        assert!(!session.has_progress());
    }
}
