//! Serial byte channel for the debugcart link.
//!
//! Provides the two pieces everything else builds on:
//! - [`SerialPort`] / [`SerialStream`]: a raw-mode TTY with a bounded per-read timeout
//! - [`write_exact`] / [`read_up_to`]: exact-count writes and best-effort bounded reads
//!   over any `Read + Write` byte channel
//!
//! A read that returns zero bytes means the channel's read timeout elapsed
//! with no data. That is not an error at this layer.

pub mod error;
pub mod io;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use io::{read_up_to, write_exact};
pub use traits::SerialStream;

#[cfg(unix)]
pub use serial::{
    effective_baud_rate, SerialConfig, SerialPort, DEFAULT_BAUD_RATE, FALLBACK_BAUD_RATE,
    SUPPORTED_BAUD_RATES,
};
