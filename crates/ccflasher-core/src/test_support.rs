//! Shared test doubles

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::programmer::DebugLink;

/// Records sent bytes and answers from a script (0 when the script runs dry)
#[derive(Default)]
pub(crate) struct ScriptedLink {
    pub sent: Vec<u8>,
    pub answers: VecDeque<u8>,
    pub delays: u32,
    pub handshakes: u32,
}

impl DebugLink for ScriptedLink {
    fn send_byte(&mut self, byte: u8) {
        self.sent.push(byte);
    }

    fn receive_byte(&mut self) -> u8 {
        self.answers.pop_front().unwrap_or(0)
    }

    fn enter_debug_mode(&mut self) {
        self.handshakes += 1;
    }

    fn pulse_reset(&mut self) {}

    fn delay_us(&mut self, _us: u32) {
        self.delays += 1;
    }
}
