//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a byte value as hex or decimal
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u16(s)?;
    u8::try_from(value).map_err(|_| format!("Value out of range for a byte: {}", s))
}

/// Breakpoint argument of `debug bp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breakpoint {
    /// Disable breakpoint 0
    Off,
    /// Arm breakpoint 0 at this code address
    At(u16),
}

/// Parse a breakpoint argument: an address, or "off" to disable
fn parse_breakpoint(s: &str) -> Result<Breakpoint, String> {
    if s.eq_ignore_ascii_case("off") {
        Ok(Breakpoint::Off)
    } else {
        parse_hex_u16(s).map(Breakpoint::At)
    }
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        ccflasher_flash::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "ccflasher")]
#[command(
    author,
    version,
    about = "TI CC111x/CC253x programmer and debugger",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory for the firmware and dump images
    /// Defaults to a temporary directory
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the target chip
    Info {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Read the whole flash to a file and verify the read
    Dump {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Erase, program and verify a firmware image
    Flash {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Firmware image (raw binary)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compare flash contents against a firmware image
    Verify {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        /// Firmware image (raw binary)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Erase the whole chip, which also clears the lock bits
    Erase {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// Read-protect the chip
    Lock {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,
    },

    /// List supported programmers
    ListProgrammers,

    /// Run control and memory inspection
    Debug {
        /// Programmer to use
        #[arg(short, long, help = programmer_help())]
        programmer: String,

        #[command(subcommand)]
        command: DebugCommands,
    },
}

#[derive(Subcommand)]
pub enum DebugCommands {
    /// Show whether the CPU is halted
    Status,

    /// Halt the CPU
    Halt,

    /// Let the CPU run
    Resume,

    /// Execute one instruction
    Step,

    /// Show PC, SFRs and R0-R7
    Regs,

    /// Read one XDATA byte
    Read {
        /// XDATA address (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u16)]
        address: u16,
    },

    /// Write one XDATA byte
    Write {
        /// XDATA address (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u16)]
        address: u16,

        /// Byte value
        #[arg(value_parser = parse_hex_u8)]
        value: u8,
    },

    /// Hex dump a block of XDATA
    Mem {
        /// XDATA address (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u16)]
        address: u16,

        /// Number of bytes (at most 512)
        #[arg(short, long, default_value = "16", value_parser = parse_hex_u16)]
        length: u16,
    },

    /// Set hardware breakpoint 0, or "off" to disable it
    Bp {
        /// Code address, or "off"
        #[arg(value_parser = parse_breakpoint)]
        address: Breakpoint,
    },
}
