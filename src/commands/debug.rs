//! Debugger commands
//!
//! These talk to a target that is already in debug mode. Only `halt` and
//! `bp` perform the debug-enable handshake, which resets and halts the CPU.

use ccflasher_flash::{FlasherController, Session};

use crate::cli::{Breakpoint, DebugCommands};

/// Largest block `mem` reads in one go
pub const MEM_READ_MAX: u16 = 512;

/// Warn when memory or register access is attempted on a running CPU
fn warn_if_running(session: &mut Session) {
    if !session.read_status().is_halted() {
        log::warn!("CPU is running; halt it first for reliable results");
    }
}

/// Run one debugger command and return the text to print
pub fn execute(session: &mut Session, command: &DebugCommands) -> ccflasher_core::Result<String> {
    let text = match command {
        DebugCommands::Status => {
            let status = session.read_status();
            format!(
                "halted: {} (status 0x{:02X}: {:?})",
                status.is_halted(),
                status.bits(),
                status
            )
        }
        DebugCommands::Halt => {
            session.halt();
            "HALTED".to_string()
        }
        DebugCommands::Resume => {
            session.resume();
            "RUNNING".to_string()
        }
        DebugCommands::Step => {
            session.step();
            "STEPPED".to_string()
        }
        DebugCommands::Regs => {
            warn_if_running(session);
            session.read_registers()?.to_string()
        }
        DebugCommands::Read { address } => {
            warn_if_running(session);
            let mut value = [0u8; 1];
            session.read_xdata(*address, &mut value)?;
            format!("0x{:04X}: 0x{:02X}", address, value[0])
        }
        DebugCommands::Write { address, value } => {
            warn_if_running(session);
            session.write_xdata(*address, &[*value])?;
            "OK".to_string()
        }
        DebugCommands::Mem { address, length } => {
            warn_if_running(session);
            let length = (*length).min(MEM_READ_MAX);
            let mut buf = vec![0u8; usize::from(length)];
            session.read_xdata(*address, &mut buf)?;
            format_hex_dump(*address, &buf)
        }
        DebugCommands::Bp { address } => {
            session.halt();
            match address {
                Breakpoint::Off => {
                    session.clear_breakpoint()?;
                    "BP DISABLED".to_string()
                }
                Breakpoint::At(addr) => {
                    session.set_breakpoint(*addr)?;
                    format!("BP SET @ 0x{:04X}", addr)
                }
            }
        }
    };
    Ok(text)
}

/// Format a hex dump, 16 bytes per line
fn format_hex_dump(address: u16, data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(i, line)| {
            let bytes: Vec<String> = line.iter().map(|b| format!("{:02X}", b)).collect();
            format!(
                "{:04X}: {}",
                address.wrapping_add((i * 16) as u16),
                bytes.join(" ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run a debugger command through the controller and print its result
pub fn run_debug(
    controller: &FlasherController,
    command: &DebugCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = controller.with_session(|session| execute(session, command))??;
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccflasher_core::protocol::DebugSession;
    use ccflasher_dummy::{DummyConfig, DummyTarget};

    fn session() -> Session {
        let mut session = DebugSession::new(
            Box::new(DummyTarget::new(DummyConfig::default())) as ccflasher_flash::BoxedLink
        );
        session.connect();
        session
    }

    #[test]
    fn test_run_control_replies() {
        let mut s = session();
        assert_eq!(execute(&mut s, &DebugCommands::Halt).unwrap(), "HALTED");
        assert_eq!(execute(&mut s, &DebugCommands::Step).unwrap(), "STEPPED");
        assert!(execute(&mut s, &DebugCommands::Status)
            .unwrap()
            .starts_with("halted: true"));
        assert_eq!(execute(&mut s, &DebugCommands::Resume).unwrap(), "RUNNING");
        assert!(execute(&mut s, &DebugCommands::Status)
            .unwrap()
            .starts_with("halted: false"));
    }

    #[test]
    fn test_write_then_read_and_mem() {
        let mut s = session();
        let write = DebugCommands::Write {
            address: 0xF010,
            value: 0x5A,
        };
        assert_eq!(execute(&mut s, &write).unwrap(), "OK");

        let read = DebugCommands::Read { address: 0xF010 };
        assert_eq!(execute(&mut s, &read).unwrap(), "0xF010: 0x5A");

        let mem = DebugCommands::Mem {
            address: 0xF000,
            length: 20,
        };
        let dump = execute(&mut s, &mem).unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("F010: 5A"));
    }

    #[test]
    fn test_mem_is_capped() {
        let mut s = session();
        let mem = DebugCommands::Mem {
            address: 0xF000,
            length: 4096,
        };
        let dump = execute(&mut s, &mem).unwrap();
        assert_eq!(dump.lines().count(), usize::from(MEM_READ_MAX) / 16);
    }

    #[test]
    fn test_breakpoint_replies() {
        let mut s = session();
        let set = DebugCommands::Bp {
            address: Breakpoint::At(0x1234),
        };
        assert_eq!(execute(&mut s, &set).unwrap(), "BP SET @ 0x1234");
        let off = DebugCommands::Bp {
            address: Breakpoint::Off,
        };
        assert_eq!(execute(&mut s, &off).unwrap(), "BP DISABLED");
    }

    #[test]
    fn test_hex_dump_format() {
        let data: Vec<u8> = (0..18).collect();
        assert_eq!(
            format_hex_dump(0x00F0, &data),
            "00F0: 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\n0100: 10 11"
        );
    }
}
