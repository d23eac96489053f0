//! Debug link trait definitions
//!
//! A [`DebugLink`] moves whole bytes over the two-wire debug interface. It is
//! deliberately infallible: the wire has no acknowledge phase, so a missing or
//! garbled answer can only be noticed one layer up, when a polled status bit
//! never shows up and the operation times out.

use alloc::boxed::Box;

/// Byte-level access to a CC debug interface
///
/// Implemented by [`BitbangLink`](super::BitbangLink) for real GPIO backends
/// and directly by emulators that do not care about individual clock edges.
pub trait DebugLink {
    /// Clock one byte out to the target, MSB first
    fn send_byte(&mut self, byte: u8);

    /// Clock one byte in from the target, MSB first
    fn receive_byte(&mut self) -> u8;

    /// Run the reset/clock handshake that puts the target into debug mode
    ///
    /// The target halts when it enters debug mode, so this doubles as the
    /// only available halt trigger.
    fn enter_debug_mode(&mut self);

    /// Pulse reset without the debug handshake so the target boots normally
    fn pulse_reset(&mut self);

    /// Delay for approximately the given number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<L: DebugLink + ?Sized> DebugLink for Box<L> {
    fn send_byte(&mut self, byte: u8) {
        (**self).send_byte(byte)
    }

    fn receive_byte(&mut self) -> u8 {
        (**self).receive_byte()
    }

    fn enter_debug_mode(&mut self) {
        (**self).enter_debug_mode()
    }

    fn pulse_reset(&mut self) {
        (**self).pulse_reset()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

impl<L: DebugLink + ?Sized> DebugLink for &mut L {
    fn send_byte(&mut self, byte: u8) {
        (**self).send_byte(byte)
    }

    fn receive_byte(&mut self) -> u8 {
        (**self).receive_byte()
    }

    fn enter_debug_mode(&mut self) {
        (**self).enter_debug_mode()
    }

    fn pulse_reset(&mut self) {
        (**self).pulse_reset()
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
