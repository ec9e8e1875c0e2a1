use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Anything a subcommand reports: a JSON object plus labelled rows for the
/// human-readable formats.
pub trait Report: Serialize {
    fn title(&self) -> &'static str;
    fn rows(&self) -> Vec<(&'static str, String)>;
}

#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub port: String,
    pub synced: bool,
}

impl Report for SyncReport {
    fn title(&self) -> &'static str {
        "sync"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PORT", self.port.clone()),
            ("SYNCED", self.synced.to_string()),
        ]
    }
}

#[derive(Debug, Serialize)]
pub struct RegistersReport {
    pub port: String,
    pub address: u32,
    pub repeat_counter: u16,
}

impl Report for RegistersReport {
    fn title(&self) -> &'static str {
        "registers"
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PORT", self.port.clone()),
            ("ADDRESS", format!("{:#010x}", self.address)),
            (
                "REPEAT COUNTER",
                format!("{} ({:#06x})", self.repeat_counter, self.repeat_counter),
            ),
        ]
    }
}

#[derive(Debug, Serialize)]
pub struct TransferReport {
    pub operation: &'static str,
    pub file: String,
    pub start_address: u32,
    pub layout: &'static str,
    pub bytes: u64,
    pub synced_before: bool,
    pub synced_after: bool,
}

impl Report for TransferReport {
    fn title(&self) -> &'static str {
        self.operation
    }

    fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("FILE", self.file.clone()),
            ("START", format!("{:#010x}", self.start_address)),
            ("LAYOUT", self.layout.to_string()),
            ("BYTES", self.bytes.to_string()),
            ("SYNC BEFORE", self.synced_before.to_string()),
            ("SYNC AFTER", self.synced_after.to_string()),
        ]
    }
}

pub fn print_report<R: Report>(report: &R, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in report.rows() {
                table.add_row(vec![name.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = report
                .rows()
                .into_iter()
                .map(|(name, value)| format!("{}={value}", name.to_lowercase().replace(' ', "_")))
                .collect();
            println!("{} {}", report.title(), fields.join(" "));
        }
    }
}

#[derive(Serialize)]
struct MemoryOutput<'a> {
    address: u32,
    length: usize,
    hex: &'a str,
}

/// Print a block of device memory read from `address`.
pub fn print_memory(address: u32, data: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let hex: String = data.iter().map(|b| format!("{b:02x}")).collect();
            let out = MemoryOutput {
                address,
                length: data.len(),
                hex: &hex,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            for line in hexdump(address, data) {
                println!("{line}");
            }
        }
        OutputFormat::Raw => print_raw(data),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Classic 16-bytes-per-line dump: address, hex bytes, printable ASCII.
pub fn hexdump(address: u32, data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let offset = address.wrapping_add((row * 16) as u32);
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            let ascii: String = chunk
                .iter()
                .map(|b| {
                    if b.is_ascii_graphic() || *b == b' ' {
                        *b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{offset:08x}  {:<47}  |{ascii}|", hex.join(" "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexdump_formats_rows() {
        let lines = hexdump(0x6000, b"HELLO\x00\x01");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("00006000  48 45 4c 4c 4f 00 01"));
        assert!(lines[0].ends_with("|HELLO..|"));
    }

    #[test]
    fn hexdump_splits_every_16_bytes() {
        let data = [0u8; 40];
        let lines = hexdump(0x10, &data);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("00000020"));
        assert!(lines[2].starts_with("00000030"));
    }

    #[test]
    fn registers_rows_use_hex() {
        let report = RegistersReport {
            port: "/dev/ttyACM0".to_string(),
            address: 0x12_3456,
            repeat_counter: 0x2112,
        };
        let rows = report.rows();
        assert_eq!(rows[1], ("ADDRESS", "0x00123456".to_string()));
        assert_eq!(rows[2].1, "8466 (0x2112)");
    }
}
