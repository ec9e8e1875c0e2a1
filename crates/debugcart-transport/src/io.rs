use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::error::{Result, TransportError};

/// Write all of `bytes` in a single write call, then flush.
///
/// The channel is expected to take the whole buffer at once. A partial
/// acceptance is a hard fault and is reported as [`TransportError::ShortWrite`],
/// never retried.
pub fn write_exact<W: Write + ?Sized>(channel: &mut W, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }

    let written = loop {
        match channel.write(bytes) {
            Ok(n) => break n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    };

    if written != bytes.len() {
        return Err(TransportError::ShortWrite {
            expected: bytes.len(),
            written,
        });
    }

    loop {
        match channel.flush() {
            Ok(()) => break,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    trace!(len = written, "wrote bytes");
    Ok(())
}

/// Read into `buf` until it is full or a single read returns no data.
///
/// Returns the number of bytes received, which is less than `buf.len()` when
/// the channel's read timeout elapsed first. `WouldBlock` and `TimedOut` are
/// treated as a timeout, `Interrupted` is retried.
pub fn read_up_to<R: Read + ?Sized>(channel: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut received = 0usize;
    while received < buf.len() {
        match channel.read(&mut buf[received..]) {
            Ok(0) => break,
            Ok(n) => received += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => break,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    trace!(requested = buf.len(), received, "read bytes");
    Ok(received)
}
