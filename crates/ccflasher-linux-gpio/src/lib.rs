//! ccflasher-linux-gpio - Linux GPIO bitbang debug-wire support
//!
//! This crate drives the CC111x/CC253x two-wire debug interface by
//! bitbanging GPIO lines through the Linux character device GPIO interface
//! (gpiocdev).
//!
//! # Example
//!
//! ```no_run
//! use ccflasher_core::programmer::BitbangLink;
//! use ccflasher_core::protocol::DebugSession;
//! use ccflasher_linux_gpio::{LinuxGpioDebug, LinuxGpioDebugConfig};
//!
//! // Configure GPIO pins for the debug wire
//! let config = LinuxGpioDebugConfig::new("/dev/gpiochip0", 4, 5, 6);
//! //                                      device         DC DD RESET_N
//!
//! let wire = LinuxGpioDebug::open(&config)?;
//! let mut session = DebugSession::new(BitbangLink::new(wire));
//! let id = session.connect();
//! println!("Chip: {} ({})", id.model(), id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with ccflasher CLI
//!
//! ```bash
//! # GPIO chip and pin numbers
//! ccflasher info -p linux_gpio:dev=/dev/gpiochip0,clk=4,data=5,rst=6
//!
//! # Using gpiochip number instead of device path, with a slower clock
//! ccflasher dump -p linux_gpio:gpiochip=0,clk=4,data=5,rst=6,delay_us=10 -o dump.bin
//! ```
//!
//! # GPIO Pin Wiring
//!
//! | Target Pin | GPIO Function | Description |
//! |------------|---------------|-------------|
//! | DC (P2.2)  | clk (output)  | Debug clock |
//! | DD (P2.1)  | data (bidir)  | Debug data |
//! | RESET_N    | rst (output)  | Target reset, active low |
//! | GND        | GND           | Ground |
//!
//! The target must run at the same I/O voltage as the host GPIO bank.
//!
//! # System Requirements
//!
//! - Linux kernel 5.5+ with GPIO character device support (bias needs the v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxGpioDebug, LinuxGpioDebugConfig};
pub use error::{LinuxGpioError, Result};

use ccflasher_core::programmer::{BitbangLink, DebugLink};

/// Open a Linux GPIO debug wire and return a boxed DebugLink
///
/// This is a convenience function for use in the CLI programmer dispatch.
///
/// # Example Options
///
/// - `dev=/dev/gpiochip0` - GPIO chip device path (or use gpiochip=N)
/// - `gpiochip=0` - GPIO chip number (alternative to dev)
/// - `clk=4` - DC pin GPIO offset (required)
/// - `data=5` - DD pin GPIO offset (required)
/// - `rst=6` - RESET_N pin GPIO offset (required)
/// - `delay_us=5` - Half-period delay in microseconds (optional)
pub fn open_linux_gpio_debug(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn DebugLink + Send>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let wire = LinuxGpioDebug::open(&config)?;
    Ok(Box::new(BitbangLink::new(wire)))
}
