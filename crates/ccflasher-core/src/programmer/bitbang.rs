//! Bitbang traits for the CC two-wire debug interface
//!
//! This module provides the pin-level half of the wire transport. A backend
//! only has to toggle three GPIO lines and reconfigure one of them; the
//! [`BitbangLink`] adapter turns that into the byte-level [`DebugLink`] the
//! protocol engine talks to.
//!
//! ## Lines
//!
//! - **DC** (debug clock): always driven by the host
//! - **DD** (debug data): bidirectional, host drives it while sending and
//!   releases it while the target answers
//! - **RESET_N**: active low target reset
//!
//! ## Timing
//!
//! Every clock edge is followed by one half period (about 5 µs). All eight
//! bits of a byte are clocked inside a critical section so an interrupt on the
//! host cannot stretch a bit; the hooks default to no-ops for hosts where that
//! is impossible (Linux userspace) and should disable interrupts on bare-metal
//! hosts.

use super::DebugLink;

/// Hold time around reset edges in the debug-enable handshake (microseconds)
const HANDSHAKE_SETTLE_US: u32 = 2_000;

/// Time the data line is left released before asserting reset (microseconds)
const RELEASE_SETTLE_US: u32 = 5_000;

/// Reset pulse width used for a normal (non-debug) restart (microseconds)
const RESET_PULSE_US: u32 = 5_000;

/// Which side currently drives the DD line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    /// DD is a host output
    HostDrives,
    /// DD is a host input, the target drives it
    TargetDrives,
}

/// Trait for low-level bitbang operations on the debug lines
pub trait BitbangDebugWire {
    /// Set debug clock (DC) line value
    fn set_clock(&mut self, high: bool);

    /// Set debug data (DD) line value; only meaningful while the host drives DD
    fn set_data(&mut self, high: bool);

    /// Sample the debug data (DD) line
    fn get_data(&self) -> bool;

    /// Set RESET_N line value (`false` holds the target in reset)
    fn set_reset(&mut self, high: bool);

    /// Reconfigure DD
    ///
    /// For [`DataDirection::HostDrives`] the line becomes an output at
    /// `level`. For [`DataDirection::TargetDrives`] it becomes an input idling
    /// at `level` (via bias where the backend supports it).
    fn configure_data(&mut self, direction: DataDirection, level: bool);

    /// Delay for half a clock period
    fn half_period_delay(&self);

    /// Delay for a longer, non timing-critical period
    fn delay_us(&mut self, us: u32);

    /// Optional: Enter a section that must not be preempted
    fn enter_critical(&mut self) {}

    /// Optional: Leave the section entered by `enter_critical`
    fn exit_critical(&mut self) {}
}

/// Bitbang helper functions for the single DD line
///
/// These are standalone functions that can be used by any `BitbangDebugWire`
/// implementation. They assume DD is already configured for the transfer
/// direction.
pub mod single {
    use super::BitbangDebugWire;

    /// Write a byte (MSB first)
    pub fn write_byte<W: BitbangDebugWire + ?Sized>(wire: &mut W, byte: u8) {
        for i in (0..8).rev() {
            wire.set_data((byte >> i) & 1 != 0);
            wire.set_clock(true);
            wire.half_period_delay();
            wire.set_clock(false);
            wire.half_period_delay();
        }
    }

    /// Read a byte (MSB first)
    pub fn read_byte<W: BitbangDebugWire + ?Sized>(wire: &mut W) -> u8 {
        let mut byte = 0u8;
        for _ in 0..8 {
            wire.set_clock(true);
            wire.half_period_delay();
            byte <<= 1;
            if wire.get_data() {
                byte |= 1;
            }
            wire.set_clock(false);
            wire.half_period_delay();
        }
        byte
    }
}

/// [`DebugLink`] implementation on top of a [`BitbangDebugWire`]
///
/// Owns the data-direction state. Whenever a transfer needs the other
/// direction, DD is reconfigured (mode and idle level) before the first clock
/// edge of that transfer.
pub struct BitbangLink<W> {
    wire: W,
    direction: DataDirection,
    level: bool,
}

impl<W: BitbangDebugWire> BitbangLink<W> {
    /// Take over the wire and put the lines into their idle state
    ///
    /// Idle: DC low, RESET_N high (released), DD host-driven high.
    pub fn new(mut wire: W) -> Self {
        wire.set_clock(false);
        wire.set_reset(true);
        wire.configure_data(DataDirection::HostDrives, true);
        Self {
            wire,
            direction: DataDirection::HostDrives,
            level: true,
        }
    }

    /// Current DD direction
    pub fn direction(&self) -> DataDirection {
        self.direction
    }

    /// Borrow the underlying wire
    pub fn wire(&self) -> &W {
        &self.wire
    }

    /// Mutably borrow the underlying wire
    pub fn wire_mut(&mut self) -> &mut W {
        &mut self.wire
    }

    /// Give the wire back
    pub fn into_inner(self) -> W {
        self.wire
    }

    fn ensure_data(&mut self, direction: DataDirection, level: bool) {
        if self.direction != direction || self.level != level {
            self.wire.configure_data(direction, level);
            self.direction = direction;
            self.level = level;
        }
    }

    fn release_data_line(&mut self) {
        // Target may drive DD during the handshake; listen with a pull-up
        self.ensure_data(DataDirection::TargetDrives, true);
    }
}

impl<W: BitbangDebugWire> DebugLink for BitbangLink<W> {
    fn send_byte(&mut self, byte: u8) {
        if self.direction != DataDirection::HostDrives {
            self.ensure_data(DataDirection::HostDrives, false);
        }
        self.wire.enter_critical();
        single::write_byte(&mut self.wire, byte);
        self.wire.exit_critical();
    }

    fn receive_byte(&mut self) -> u8 {
        if self.direction != DataDirection::TargetDrives {
            self.ensure_data(DataDirection::TargetDrives, false);
        }
        self.wire.enter_critical();
        let byte = single::read_byte(&mut self.wire);
        self.wire.exit_critical();
        byte
    }

    fn enter_debug_mode(&mut self) {
        self.release_data_line();
        self.wire.delay_us(RELEASE_SETTLE_US);
        self.wire.set_reset(false);
        self.wire.delay_us(HANDSHAKE_SETTLE_US);

        // Two DC pulses while RESET_N is low
        self.wire.set_clock(true);
        self.wire.half_period_delay();
        self.wire.set_clock(false);
        self.wire.half_period_delay();
        self.wire.set_clock(true);
        self.wire.half_period_delay();
        self.wire.set_clock(false);

        self.wire.delay_us(HANDSHAKE_SETTLE_US);
        self.wire.set_reset(true);
        self.wire.delay_us(HANDSHAKE_SETTLE_US);
        log::trace!("bitbang: debug-enable handshake sent");
    }

    fn pulse_reset(&mut self) {
        self.release_data_line();
        self.wire.delay_us(RELEASE_SETTLE_US);
        self.wire.set_reset(false);
        self.wire.delay_us(RESET_PULSE_US);
        self.wire.set_reset(true);
        self.wire.delay_us(HANDSHAKE_SETTLE_US);
    }

    fn delay_us(&mut self, us: u32) {
        self.wire.delay_us(us);
    }
}
