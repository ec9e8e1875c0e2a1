use std::io::{Read, Write};

use debugcart_proto::{encode_block_read, encode_block_write, Command, MAX_CHUNK_SIZE};
use debugcart_transport::{read_up_to, write_exact};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{ProtocolError, Result};
use crate::session::{DeviceSession, TransferState};

impl<T: Read + Write, C: Clock> DeviceSession<T, C> {
    /// Read `dst.len()` bytes of device memory starting at `address`.
    ///
    /// Re-establishes address, mode and counter, sends the read command, then
    /// keeps reading until every byte has arrived, sleeping
    /// `poll_interval` between attempts. Fails with
    /// [`ProtocolError::Timeout`] once `transfer_timeout` has elapsed. On
    /// failure the unreceived tail of `dst` is unspecified and must be
    /// discarded.
    ///
    /// The length must fit the 16-bit repeat counter and the range must not
    /// run past the end of the address space. An empty `dst` is a no-op.
    pub fn read_block(&mut self, dst: &mut [u8], address: u32) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        let len = counter_len(dst.len())?;
        check_span(u64::from(address), u64::from(len))?;

        self.begin();
        let result = self.read_block_inner(dst, address, len);
        self.finish(&result);
        result
    }

    fn read_block_inner(&mut self, dst: &mut [u8], address: u32, len: u16) -> Result<()> {
        self.prepare(address, len)?;
        self.send(Command::BlockRead, &encode_block_read())?;
        self.state = TransferState::CommandSent;

        let budget = self.config.transfer_timeout;
        let started = self.clock.now();
        let mut received = 0usize;
        loop {
            received += read_up_to(&mut self.channel, &mut dst[received..])?;
            if received > 0 {
                self.state = TransferState::Transferring;
            }
            if received == dst.len() {
                debug!(address, len, "block read complete");
                return Ok(());
            }

            if self.clock.now().saturating_sub(started) >= budget {
                return Err(ProtocolError::Timeout {
                    expected: dst.len(),
                    received,
                    budget,
                });
            }
            self.clock.sleep(self.config.poll_interval);
        }
    }

    /// Write at most one chunk of `src` to device memory at `address`.
    ///
    /// Sends `min(src.len(), MAX_CHUNK_SIZE)` bytes and returns that count;
    /// callers loop, advancing `address` by the returned value. A sync probe
    /// follows the payload. Unless `verify_writes` is set its result is only
    /// logged. An empty `src` is a no-op returning 0. A chunk that would run
    /// past the end of the address space is refused before anything is sent.
    pub fn write_block(&mut self, src: &[u8], address: u32) -> Result<usize> {
        if src.is_empty() {
            return Ok(0);
        }
        let chunk = &src[..src.len().min(MAX_CHUNK_SIZE)];
        check_span(u64::from(address), chunk.len() as u64)?;

        self.begin();
        let result = self.write_block_inner(chunk, address);
        self.finish(&result);
        result
    }

    fn write_block_inner(&mut self, chunk: &[u8], address: u32) -> Result<usize> {
        // MAX_CHUNK_SIZE fits the counter.
        self.prepare(address, chunk.len() as u16)?;
        self.send(Command::BlockWrite, &encode_block_write())?;
        self.state = TransferState::CommandSent;

        write_exact(&mut self.channel, chunk)?;
        self.state = TransferState::Transferring;

        if !self.try_sync()? {
            if self.config.verify_writes {
                return Err(ProtocolError::SyncLost { address });
            }
            warn!(address, len = chunk.len(), "no sync after block write");
        }

        debug!(address, len = chunk.len(), "block write complete");
        Ok(chunk.len())
    }

    /// Write all of `src` starting at `address`, one chunk per block write.
    ///
    /// The whole range must lie below 4 GiB; otherwise nothing is sent.
    pub fn write_all_blocks(&mut self, src: &[u8], address: u32) -> Result<usize> {
        let mut sent = 0usize;
        for (chunk_address, len) in chunk_spans(u64::from(address), src.len() as u64)? {
            sent += self.write_block(&src[sent..sent + len], chunk_address)?;
        }
        Ok(sent)
    }

    /// Read a region of any length as successive chunk-sized block reads.
    ///
    /// The whole range must lie below 4 GiB; otherwise nothing is sent.
    pub fn read_region(&mut self, dst: &mut [u8], address: u32) -> Result<()> {
        let mut offset = 0usize;
        for (chunk_address, len) in chunk_spans(u64::from(address), dst.len() as u64)? {
            self.read_block(&mut dst[offset..offset + len], chunk_address)?;
            offset += len;
        }
        Ok(())
    }

    /// Address, mode and counter: the state every transfer starts from.
    fn prepare(&mut self, address: u32, len: u16) -> Result<()> {
        self.set_address(address)?;
        self.state = TransferState::AddressSet;
        self.enable_auto_increment()?;
        self.state = TransferState::ModeSet;
        self.set_repeat_counter(len)?;
        self.state = TransferState::CounterSet;
        Ok(())
    }

    fn begin(&mut self) {
        self.state = TransferState::Idle;
        self.failed_at = None;
    }

    fn finish<R>(&mut self, result: &Result<R>) {
        if result.is_ok() {
            self.state = TransferState::Done;
        } else {
            self.failed_at = Some(self.state);
            self.state = TransferState::Failed;
        }
    }
}

/// One past the highest device address.
const ADDRESS_SPACE: u64 = 1 << 32;

/// Reject `[address, address + len)` if it runs past the device address space.
pub(crate) fn check_span(address: u64, len: u64) -> Result<u64> {
    address
        .checked_add(len)
        .filter(|end| *end <= ADDRESS_SPACE)
        .ok_or(ProtocolError::AddressOverflow { address, len })
}

/// Split `[address, address + len)` into `(address, len)` pieces of at most
/// [`MAX_CHUNK_SIZE`] bytes. The range is checked up front.
pub(crate) fn chunk_spans(address: u64, len: u64) -> Result<ChunkSpans> {
    let end = check_span(address, len)?;
    Ok(ChunkSpans { next: address, end })
}

pub(crate) struct ChunkSpans {
    next: u64,
    end: u64,
}

impl Iterator for ChunkSpans {
    type Item = (u32, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let address = u32::try_from(self.next).ok()?;
        let len = (self.end - self.next).min(MAX_CHUNK_SIZE as u64);
        self.next += len;
        Some((address, len as usize))
    }
}

fn counter_len(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| ProtocolError::LengthOutOfRange {
        len,
        max: usize::from(u16::MAX),
    })
}
