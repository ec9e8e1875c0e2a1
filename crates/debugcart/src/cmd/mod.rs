use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use debugcart_session::{DeviceSession, LoadLayout, SessionConfig};
use debugcart_transport::{SerialConfig, SerialPort, SerialStream};
use tracing::debug;

use crate::exit::{transport_error, CliResult};
use crate::output::OutputFormat;

pub mod dump;
pub mod load;
pub mod peek;
pub mod regs;
pub mod sync;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe the device with a single sync byte.
    Sync(SyncArgs),
    /// Read the address and repeat counter registers.
    Regs(RegsArgs),
    /// Write the address (and optionally the repeat counter) register, then read both back.
    SetRegs(SetRegsArgs),
    /// Load a raw binary file into device memory.
    Load(LoadArgs),
    /// Save a region of device memory to a file.
    Dump(DumpArgs),
    /// Print a region of device memory.
    Peek(PeekArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Where the device is attached. Shared by every subcommand that talks to it.
#[derive(Debug, Clone)]
pub struct PortSettings {
    pub path: PathBuf,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

pub fn run(command: Command, port: &PortSettings, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Sync(args) => sync::run(args, port, format),
        Command::Regs(args) => regs::run(args, port, format),
        Command::SetRegs(args) => regs::run_set(args, port, format),
        Command::Load(args) => load::run(args, port, format),
        Command::Dump(args) => dump::run(args, port, format),
        Command::Peek(args) => peek::run(args, port, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct SyncArgs {}

#[derive(Args, Debug, Default)]
pub struct RegsArgs {}

#[derive(Args, Debug)]
pub struct SetRegsArgs {
    /// Address register value (decimal or 0x hex).
    #[arg(long, short = 'a', value_parser = parse_u32)]
    pub address: u32,
    /// Repeat counter value (decimal or 0x hex).
    #[arg(long, short = 'n', value_parser = parse_u16)]
    pub counter: Option<u16>,
}

/// How file bytes are laid out in device memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// Contiguous, byte for byte.
    Linear,
    /// 6 KiB of file per 8 KiB GROM slot.
    GromTight,
}

impl From<LayoutArg> for LoadLayout {
    fn from(value: LayoutArg) -> Self {
        match value {
            LayoutArg::Linear => LoadLayout::Linear,
            LayoutArg::GromTight => LoadLayout::GromTight,
        }
    }
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Raw binary file to load.
    pub file: PathBuf,
    /// Device address of the first byte (decimal or 0x hex). When omitted,
    /// address and layout are chosen from the file name.
    #[arg(long, short = 'a', value_parser = parse_u32)]
    pub address: Option<u32>,
    /// Address layout of the file contents.
    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,
    /// Load at most this many bytes of the file.
    #[arg(long, value_parser = parse_u64)]
    pub max_len: Option<u64>,
    /// Fail when the device does not answer the sync probe after a block write.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// File to create.
    pub file: PathBuf,
    /// Device address of the first byte (decimal or 0x hex).
    #[arg(long, short = 'a', value_parser = parse_u32)]
    pub address: u32,
    /// Number of bytes to save (decimal or 0x hex).
    #[arg(long, short = 'l', value_parser = parse_u64)]
    pub length: u64,
    /// Budget for each block read (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    pub timeout: Duration,
}

#[derive(Args, Debug)]
pub struct PeekArgs {
    /// Device address of the first byte (decimal or 0x hex).
    #[arg(long, short = 'a', value_parser = parse_u32)]
    pub address: u32,
    /// Number of bytes to read, at most 65535 (decimal or 0x hex).
    #[arg(long, short = 'l', default_value = "256", value_parser = parse_u16)]
    pub length: u16,
    /// Budget for the block read (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    pub timeout: Duration,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Open the serial port and wrap it in a session.
pub fn open_session(
    port: &PortSettings,
    config: SessionConfig,
) -> CliResult<DeviceSession<SerialStream>> {
    let serial = SerialConfig {
        baud_rate: port.baud_rate,
        read_timeout: port.read_timeout,
    };
    let stream = SerialPort::open_with_config(&port.path, &serial)
        .map_err(|err| transport_error("open failed", err))?;
    debug!(port = %stream.path().display(), read_timeout = ?port.read_timeout, "session opened");
    Ok(DeviceSession::with_config(stream, config))
}

pub fn display_path(path: &Path) -> String {
    path.display().to_string()
}

fn parse_number(input: &str) -> Result<u64, String> {
    let input = input.trim().replace('_', "");
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse::<u64>(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

pub fn parse_u64(input: &str) -> Result<u64, String> {
    parse_number(input)
}

pub fn parse_u32(input: &str) -> Result<u32, String> {
    let value = parse_number(input)?;
    u32::try_from(value).map_err(|_| format!("{input} does not fit in 32 bits"))
}

pub fn parse_u16(input: &str) -> Result<u16, String> {
    let value = parse_number(input)?;
    u16::try_from(value).map_err(|_| format!("{input} does not fit in 16 bits"))
}

pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numbers_decimal_and_hex() {
        assert_eq!(parse_u32("4096").unwrap(), 4096);
        assert_eq!(parse_u32("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_u32("0X4_0000").unwrap(), 0x4_0000);
        assert_eq!(parse_u16("0xffff").unwrap(), u16::MAX);
    }

    #[test]
    fn parse_numbers_rejects_overflow_and_garbage() {
        assert!(parse_u16("65536").is_err());
        assert!(parse_u32("0x1_0000_0000").is_err());
        assert!(parse_u64("abc").is_err());
        assert!(parse_u64("").is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }
}
