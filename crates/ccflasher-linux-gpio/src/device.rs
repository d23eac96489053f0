//! Linux GPIO debug-wire bitbanging implementation
//!
//! This module provides the `LinuxGpioDebug` struct that implements the
//! `BitbangDebugWire` trait using Linux's GPIO character device interface
//! (gpiocdev). Wrapped in a `BitbangLink` it becomes a `DebugLink`.
//!
//! The DD line is the only one that changes direction. While the target
//! answers it is an input with a pull resistor providing the idle level.

use crate::error::{LinuxGpioError, Result};

use gpiocdev::line::{Bias, Offset, Value};
use gpiocdev::request::{Config, Request};

use ccflasher_core::programmer::{BitbangDebugWire, DataDirection};

/// GPIO line indices
#[derive(Debug, Clone, Copy)]
enum Line {
    Clock = 0,
    Data = 1,
    Reset = 2,
}

/// Number of GPIO lines we use
const NUM_LINES: usize = 3;

/// Default half-period delay in nanoseconds (≈5 µs per clock edge)
const DEFAULT_HALF_PERIOD_NS: u64 = 5000;

/// Configuration for opening a Linux GPIO debug wire
#[derive(Debug, Clone)]
pub struct LinuxGpioDebugConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// DC (debug clock) GPIO line offset
    pub clock: Offset,
    /// DD (debug data) GPIO line offset
    pub data: Offset,
    /// RESET_N GPIO line offset
    pub reset: Offset,
    /// Half-period delay in nanoseconds
    pub half_period_ns: u64,
}

impl Default for LinuxGpioDebugConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            clock: 0,
            data: 0,
            reset: 0,
            half_period_ns: DEFAULT_HALF_PERIOD_NS,
        }
    }
}

impl LinuxGpioDebugConfig {
    /// Create a new configuration with the given device path and pins
    pub fn new(device: impl Into<String>, clock: Offset, data: Offset, reset: Offset) -> Self {
        Self {
            device: device.into(),
            clock,
            data,
            reset,
            ..Default::default()
        }
    }

    /// Set the half-period delay in nanoseconds
    pub fn with_half_period_ns(mut self, ns: u64) -> Self {
        self.half_period_ns = ns;
        self
    }

    /// Set the half-period delay in microseconds
    pub fn with_delay_us(mut self, us: u64) -> Self {
        self.half_period_ns = us * 1000;
        self
    }
}

/// Linux GPIO debug wire using bitbanging
pub struct LinuxGpioDebug {
    /// GPIO line request handle
    request: Request,
    /// GPIO line offsets indexed by Line enum
    offsets: [Offset; NUM_LINES],
    /// Half-period delay in nanoseconds
    half_period_ns: u64,
}

fn level(high: bool) -> Value {
    if high {
        Value::Active
    } else {
        Value::Inactive
    }
}

impl LinuxGpioDebug {
    /// Open the GPIO lines with the given configuration
    ///
    /// Lines start idle: DC low, DD output high, RESET_N high.
    pub fn open(config: &LinuxGpioDebugConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        if config.clock == config.data
            || config.clock == config.reset
            || config.data == config.reset
        {
            return Err(LinuxGpioError::DuplicateLine);
        }

        log::debug!("linux_gpio: Opening device {}", config.device);

        let mut offsets = [0u32; NUM_LINES];
        offsets[Line::Clock as usize] = config.clock;
        offsets[Line::Data as usize] = config.data;
        offsets[Line::Reset as usize] = config.reset;

        let mut req_config = Config::default();
        req_config.with_line(config.clock).as_output(Value::Inactive);
        req_config.with_line(config.data).as_output(Value::Active);
        req_config.with_line(config.reset).as_output(Value::Active);

        let request = Request::from_config(req_config)
            .on_chip(&config.device)
            .with_consumer("ccflasher")
            .request()
            .map_err(LinuxGpioError::LineRequestFailed)?;

        log::info!(
            "linux_gpio: Opened {} (clk={}, data={}, rst={})",
            config.device,
            config.clock,
            config.data,
            config.reset
        );

        Ok(Self {
            request,
            offsets,
            half_period_ns: config.half_period_ns,
        })
    }

    fn set_line(&self, line: Line, high: bool, name: &str) {
        if let Err(e) = self
            .request
            .set_value(self.offsets[line as usize], level(high))
        {
            log::error!("Failed to set {}: {}", name, e);
        }
    }
}

impl BitbangDebugWire for LinuxGpioDebug {
    fn set_clock(&mut self, high: bool) {
        self.set_line(Line::Clock, high, "DC");
    }

    fn set_data(&mut self, high: bool) {
        self.set_line(Line::Data, high, "DD");
    }

    fn get_data(&self) -> bool {
        match self.request.value(self.offsets[Line::Data as usize]) {
            Ok(Value::Active) => true,
            Ok(Value::Inactive) => false,
            Err(e) => {
                log::error!("Failed to get DD: {}", e);
                false
            }
        }
    }

    fn set_reset(&mut self, high: bool) {
        self.set_line(Line::Reset, high, "RESET_N");
    }

    fn configure_data(&mut self, direction: DataDirection, high: bool) {
        let mut cfg = Config::default();
        match direction {
            DataDirection::HostDrives => {
                cfg.with_line(self.offsets[Line::Data as usize])
                    .as_output(level(high));
            }
            DataDirection::TargetDrives => {
                let bias = if high { Bias::PullUp } else { Bias::PullDown };
                cfg.with_line(self.offsets[Line::Data as usize])
                    .as_input()
                    .with_bias(bias);
            }
        }

        if let Err(e) = self.request.reconfigure(&cfg) {
            log::error!("Failed to reconfigure DD as {:?}: {}", direction, e);
        }
    }

    fn half_period_delay(&self) {
        if self.half_period_ns > 0 {
            std::thread::sleep(std::time::Duration::from_nanos(self.half_period_ns));
        }
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(std::time::Duration::from_micros(us as u64));
    }
}

fn parse_line(name: &'static str, value: &str) -> Result<Offset> {
    value.parse().map_err(|_| LinuxGpioError::InvalidLineNumber {
        name,
        value: value.to_string(),
    })
}

/// Parse programmer options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (required, or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `clk=N` - DC (debug clock) GPIO line offset (required)
/// - `data=N` - DD (debug data) GPIO line offset (required)
/// - `rst=N` - RESET_N GPIO line offset (required)
/// - `delay_us=N` - Half-period delay in microseconds (optional, default 5)
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxGpioDebugConfig> {
    let mut config = LinuxGpioDebugConfig::default();
    let mut clock = None;
    let mut data = None;
    let mut reset = None;
    let mut gpiochip: Option<u32> = None;

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "gpiochip" => {
                gpiochip = Some(value.parse().map_err(|_| {
                    LinuxGpioError::InvalidParameter(format!("Invalid gpiochip value: {}", value))
                })?);
            }
            "clk" => clock = Some(parse_line("clk", value)?),
            "data" => data = Some(parse_line("data", value)?),
            "rst" => reset = Some(parse_line("rst", value)?),
            "delay_us" => {
                let us: u64 = value.parse().map_err(|_| {
                    LinuxGpioError::InvalidParameter(format!("Invalid delay_us value: {}", value))
                })?;
                config = config.with_delay_us(us);
            }
            _ => {
                log::warn!("linux_gpio: Unknown option: {}={}", key, value);
            }
        }
    }

    // Handle dev vs gpiochip
    if config.device.is_empty() {
        match gpiochip {
            Some(n) if n > 9 => {
                return Err(LinuxGpioError::InvalidParameter(
                    "Maximum gpiochip number supported is 9".to_string(),
                ))
            }
            Some(n) => config.device = format!("/dev/gpiochip{}", n),
            None => return Err(LinuxGpioError::NoDevice),
        }
    } else if gpiochip.is_some() {
        return Err(LinuxGpioError::InvalidParameter(
            "Only one of 'dev' or 'gpiochip' can be specified".to_string(),
        ));
    }

    config.clock = clock.ok_or(LinuxGpioError::MissingParameter("clk"))?;
    config.data = data.ok_or(LinuxGpioError::MissingParameter("data"))?;
    config.reset = reset.ok_or(LinuxGpioError::MissingParameter("rst"))?;

    Ok(config)
}
