mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cmd::{Command, PortSettings};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "debugcart", version, about = "debugcart FPGA memory access CLI")]
struct Cli {
    /// Serial device the cart is attached to.
    #[arg(
        long,
        value_name = "PATH",
        env = "DEBUGCART_PORT",
        default_value = "/dev/ttyACM0",
        global = true
    )]
    port: PathBuf,

    /// Line speed (4800, 9600, 19200, 38400, 115200 or 230400).
    #[arg(
        long,
        value_name = "BAUD",
        env = "DEBUGCART_BAUD",
        default_value_t = debugcart_transport::DEFAULT_BAUD_RATE,
        global = true
    )]
    baud: u32,

    /// How long one read waits for the device before giving up (e.g. 100ms).
    #[arg(
        long,
        value_name = "DURATION",
        env = "DEBUGCART_READ_TIMEOUT",
        default_value = "100ms",
        value_parser = cmd::parse_duration,
        global = true
    )]
    read_timeout: Duration,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let port = PortSettings {
        path: cli.port,
        baud_rate: cli.baud,
        read_timeout: cli.read_timeout,
    };
    let result = cmd::run(cli.command, &port, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
