use std::path::PathBuf;
use std::time::Duration;

use debugcart_proto::Command;

/// Errors that can occur in protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] debugcart_transport::TransportError),

    /// A block read did not complete within the transfer budget.
    #[error("block read timed out after {budget:?} ({received} of {expected} bytes)")]
    Timeout {
        expected: usize,
        received: usize,
        budget: Duration,
    },

    /// The device sent fewer response bytes than the command requires.
    #[error("incomplete {command} response ({received} of {expected} bytes)")]
    Incomplete {
        command: Command,
        expected: usize,
        received: usize,
    },

    /// A transfer length does not fit the device's repeat counter.
    #[error("transfer length {len} out of range (max {max})")]
    LengthOutOfRange { len: usize, max: usize },

    /// A transfer range runs past the 32-bit device address space.
    #[error("transfer of {len} bytes at {address:#x} runs past the end of the address space")]
    AddressOverflow { address: u64, len: u64 },

    /// The sync probe after a block write was not echoed.
    #[error("device lost sync after writing at {address:#x}")]
    SyncLost { address: u32 },

    /// Another caller holds the session.
    #[error("session busy")]
    Busy,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while moving files to or from the device.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// The local file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Reading or writing the local file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The session could not be used.
    #[error("session unavailable: {0}")]
    Session(#[from] ProtocolError),

    /// A device transfer failed part way through.
    #[error("transfer failed at {address:#x} after {written} bytes: {source}")]
    Transfer {
        written: u64,
        address: u32,
        source: ProtocolError,
    },
}

impl LoaderError {
    /// Bytes moved before the failure.
    pub fn bytes_transferred(&self) -> u64 {
        match self {
            Self::Transfer { written, .. } => *written,
            Self::FileNotFound { .. } | Self::Io { .. } | Self::Session(_) => 0,
        }
    }
}
