use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// An open serial device in raw binary mode. Implements `Read + Write`.
///
/// Reads are bounded by the line's read timeout: a read returns as soon as at
/// least one byte is available, or with zero bytes once the timeout elapses.
/// The device is closed when the stream is dropped.
pub struct SerialStream {
    file: File,
    path: PathBuf,
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl SerialStream {
    pub(crate) fn from_file(file: File, path: PathBuf) -> Self {
        Self { file, path }
    }

    /// Path of the device node this stream was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the per-read timeout of the line.
    ///
    /// The line counts in tenths of a second, so the timeout is rounded up
    /// and capped at 25.5 s. A zero timeout makes reads return immediately.
    #[cfg(unix)]
    pub fn set_read_timeout(&self, timeout: Duration) -> Result<()> {
        use std::os::fd::AsRawFd;

        crate::serial::apply_read_timeout(self.as_raw_fd(), timeout).map_err(|source| {
            crate::error::TransportError::Configure {
                path: self.path.clone(),
                source,
            }
        })
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for SerialStream {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        std::os::fd::AsRawFd::as_raw_fd(&self.file)
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("path", &self.path)
            .finish()
    }
}
