//! Chip identification command

use ccflasher_flash::{ChipIdentity, FlasherController};

use super::format_size;

/// Bytes of code memory shown by `info`
const PREVIEW_LEN: usize = 64;

/// Result of the `info` command
pub struct ChipReport {
    /// What `identify` found
    pub identity: ChipIdentity,
    /// Start of code memory, `None` when the chip is locked
    pub preview: Option<Vec<u8>>,
}

/// Identify the target and read a code preview
pub fn probe_chip(
    controller: &FlasherController,
) -> Result<ChipReport, Box<dyn std::error::Error>> {
    let report = controller.with_session(|session| {
        session.connect();
        let identity = session.identify()?;
        let preview = if identity.locked {
            None
        } else {
            let mut buf = vec![0u8; PREVIEW_LEN];
            session.read_code(0, &mut buf)?;
            Some(buf)
        };
        Ok::<_, ccflasher_core::Error>(ChipReport { identity, preview })
    })??;
    Ok(report)
}

/// Format bytes as space separated upper-case hex
fn hex_bytes(bytes: &[u8], separator: &str) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Print what `probe_chip` found
pub fn print_chip_info(report: &ChipReport) {
    let identity = &report.identity;

    println!("Chip Information");
    println!("================");
    println!();
    println!("Model:           {}", identity.model);
    println!("Chip ID:         {}", identity.id);
    println!(
        "Locked:          {}",
        if identity.locked {
            "yes (read protected)"
        } else {
            "no"
        }
    );
    match identity.flash_size {
        Some(size) => println!("Flash size:      {} (detected)", format_size(size)),
        None => println!("Flash size:      unknown"),
    }
    match identity.ieee_address {
        Some(addr) => println!("IEEE address:    {}", hex_bytes(&addr, ":")),
        None if identity.model.has_ieee_address() => println!("IEEE address:    unavailable"),
        None => println!("IEEE address:    N/A"),
    }
    println!("Info page:       {}", hex_bytes(&identity.info_page, " "));

    println!();
    match &report.preview {
        Some(preview) => {
            println!("Code preview:");
            for (i, line) in preview.chunks(16).enumerate() {
                println!("  {:04X}: {}", i * 16, hex_bytes(line, " "));
            }
        }
        None => println!("Code preview:    LOCKED"),
    }
}
