//! Programmer registry and initialization
//!
//! This module opens debug-wire programmers by name. Each backend is behind
//! its own cargo feature; the registry only knows about the ones compiled in.

use std::collections::HashMap;

use crate::controller::BoxedLink;

/// Parsed programmer parameters
pub struct ProgrammerParams {
    /// Programmer name (canonical)
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Parameters as the `(key, value)` list backends parse
    pub fn options(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_programmer_params("linux_gpio:gpiochip=0,clk=4")?;
/// assert_eq!(params.name, "linux_gpio");
/// assert_eq!(params.params.get("clk"), Some(&"4".to_string()));
/// ```
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Open a programmer and return its debug link
///
/// # Arguments
/// * `programmer` - Programmer string (e.g., "dummy" or
///   "linux_gpio:dev=/dev/gpiochip0,clk=4,data=5,rst=6")
///
/// # Example
/// ```ignore
/// let link = open_programmer("dummy:chip=cc2530")?;
/// let controller = FlasherController::new(link, store);
/// ```
pub fn open_programmer(programmer: &str) -> Result<BoxedLink, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params),

        #[cfg(feature = "linux-gpio")]
        "linux_gpio" | "linux-gpio" | "gpio" => open_linux_gpio(&params),

        _ => Err(format!("Unknown programmer: {}", params.name).into()),
    }
}

// Programmer-specific open functions

#[cfg(feature = "dummy")]
fn open_dummy(params: &ProgrammerParams) -> Result<BoxedLink, Box<dyn std::error::Error>> {
    use ccflasher_dummy::{parse_options, DummyTarget};

    let config =
        parse_options(&params.options()).map_err(|e| format!("Invalid dummy parameters: {}", e))?;
    log::info!(
        "Opening dummy target (chip id 0x{:02X}, {} KiB flash)",
        config.chip_id,
        config.flash_size / 1024
    );
    Ok(Box::new(DummyTarget::new(config)))
}

#[cfg(feature = "linux-gpio")]
fn open_linux_gpio(params: &ProgrammerParams) -> Result<BoxedLink, Box<dyn std::error::Error>> {
    log::info!("Opening Linux GPIO debug wire...");

    ccflasher_linux_gpio::open_linux_gpio_debug(&params.options()).map_err(|e| {
        format!(
            "Failed to open GPIO lines: {}\n\
             Make sure the gpiochip exists and you have read/write permissions.\n\
             Usage: linux_gpio:dev=/dev/gpiochipN,clk=<line>,data=<line>,rst=<line>",
            e
        )
        .into()
    })
}

// Programmer information and listing
/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Emulated CC111x/CC253x target (chip=<cc1110|cc1111|cc2530|cc2531>,size=<bytes>)",
    });

    #[cfg(feature = "linux-gpio")]
    programmers.push(ProgrammerInfo {
        name: "linux_gpio",
        aliases: &["linux-gpio", "gpio"],
        description: "Linux GPIO bitbang (dev=/dev/gpiochipN,clk=<line>,data=<line>,rst=<line>)",
    });

    programmers
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    if programmers.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}
