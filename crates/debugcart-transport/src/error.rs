use std::path::PathBuf;

/// Errors that can occur on the byte channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to switch the serial device into raw binary mode.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the channel (not a timeout).
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel accepted fewer bytes than requested.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { expected: usize, written: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
