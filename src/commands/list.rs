//! List commands implementation

use ccflasher_flash::available_programmers;

/// List all programmers compiled into this build
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();

    let programmers = available_programmers();
    if programmers.is_empty() {
        println!("  none (recompile with programmer features)");
        return;
    }

    for programmer in programmers {
        println!("  {:<11} - {}", programmer.name, programmer.description);
        if !programmer.aliases.is_empty() {
            println!("  {:<11}   aliases: {}", "", programmer.aliases.join(", "));
        }
    }
}

/// Format a byte count for display
pub fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(32 * 1024), "32 KiB");
        assert_eq!(format_size(2 * 1024 * 1024), "2 MiB");
    }
}
