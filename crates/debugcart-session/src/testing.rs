//! Test doubles: an in-memory device simulator, a scripted channel and a
//! manually advanced clock.

use std::collections::{HashMap, VecDeque};
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use debugcart_proto::{decode_set_address, decode_set_counter, Command};

use crate::clock::Clock;

/// Simulates the device side of the protocol against a sparse memory.
#[derive(Debug, Default)]
pub struct FakeDevice {
    memory: HashMap<u32, u8>,
    address: u32,
    counter: u16,
    auto_increment: bool,
    pending: Vec<u8>,
    output: VecDeque<u8>,
    commands: Vec<Command>,
    block_writes: Vec<(u32, usize)>,
    /// Answer sync probes with this byte instead of echoing.
    pub sync_reply: Option<u8>,
    /// Drop every response byte.
    pub mute: bool,
    /// Make `write` fail once this many write calls have succeeded.
    pub fail_after_writes: Option<usize>,
    writes: usize,
    /// Cap the bytes returned by a single `read` call.
    pub max_read: Option<usize>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poke(&mut self, address: u32, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.memory.insert(address.wrapping_add(i as u32), *byte);
        }
    }

    pub fn peek(&self, address: u32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                *self
                    .memory
                    .get(&address.wrapping_add(i as u32))
                    .unwrap_or(&0)
            })
            .collect()
    }

    pub fn set_registers(&mut self, address: u32, counter: u16) {
        self.address = address;
        self.counter = counter;
    }

    pub fn registers(&self) -> (u32, u16) {
        (self.address, self.counter)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// `(address, length)` of every completed block write.
    pub fn block_writes(&self) -> &[(u32, usize)] {
        &self.block_writes
    }

    fn respond(&mut self, bytes: &[u8]) {
        if !self.mute {
            self.output.extend(bytes);
        }
    }

    fn advance(&mut self, len: usize) {
        if self.auto_increment {
            self.address = self.address.wrapping_add(len as u32);
        }
    }

    /// Execute as many complete commands as `pending` holds.
    fn process(&mut self) {
        loop {
            let Some(&tag) = self.pending.first() else {
                return;
            };
            let Some(command) = Command::from_tag(tag) else {
                // Unknown bytes are ignored one at a time.
                self.pending.remove(0);
                continue;
            };

            let needed = match command {
                Command::BlockWrite => 1 + usize::from(self.counter),
                other => other.wire_len(),
            };
            if self.pending.len() < needed {
                return;
            }
            let bytes: Vec<u8> = self.pending.drain(..needed).collect();
            self.commands.push(command);

            match command {
                Command::Sync => {
                    let reply = self.sync_reply.unwrap_or(tag);
                    self.respond(&[reply]);
                }
                Command::SetAddress => {
                    if let Ok(address) = decode_set_address(&bytes) {
                        self.address = address;
                    }
                }
                Command::GetAddress(index) => {
                    let byte = self.address.to_le_bytes()[usize::from(index)];
                    self.respond(&[byte]);
                }
                Command::SetMode => self.auto_increment = bytes[1] == b'3',
                Command::SetCounter => {
                    if let Ok(counter) = decode_set_counter(&bytes) {
                        self.counter = counter;
                    }
                }
                Command::GetCounter => {
                    let counter = self.counter.to_le_bytes();
                    self.respond(&counter);
                }
                Command::BlockRead => {
                    let len = usize::from(self.counter);
                    let data = self.peek(self.address, len);
                    self.respond(&data);
                    self.advance(len);
                }
                Command::BlockWrite => {
                    let len = usize::from(self.counter);
                    let start = self.address;
                    self.poke(start, &bytes[1..]);
                    self.block_writes.push((start, len));
                    self.advance(len);
                }
            }
        }
    }
}

impl Write for FakeDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(limit) = self.fail_after_writes {
            if self.writes >= limit {
                return Err(std::io::Error::from(ErrorKind::BrokenPipe));
            }
        }
        self.writes += 1;
        self.pending.extend_from_slice(buf);
        self.process();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for FakeDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let limit = self.max_read.unwrap_or(usize::MAX).min(buf.len());
        let n = limit.min(self.output.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.output.pop_front().unwrap_or(0);
        }
        Ok(n)
    }
}

/// A channel that records writes and replays a fixed read script.
///
/// Each script entry is consumed by one `read` call: `Some(bytes)` delivers
/// the bytes, `None` simulates the per-read timeout (zero bytes).
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    pub written: Vec<u8>,
    script: VecDeque<Option<Vec<u8>>>,
}

impl ScriptedChannel {
    pub fn new(script: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            written: Vec::new(),
            script: script.into(),
        }
    }
}

impl Write for ScriptedChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.script.pop_front() {
            Some(Some(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.script.push_front(Some(bytes[n..].to_vec()));
                }
                Ok(n)
            }
            Some(None) | None => Ok(0),
        }
    }
}

/// A clock that only moves when slept on.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_device_echoes_sync() {
        let mut device = FakeDevice::new();
        device.write_all(b".").unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(device.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'.');
    }

    #[test]
    fn fake_device_handles_split_commands() {
        let mut device = FakeDevice::new();
        device.write_all(b"A\x00B\x10").unwrap();
        device.write_all(b"C\x00D\x00").unwrap();
        assert_eq!(device.registers().0, 0x1000);
    }

    #[test]
    fn scripted_channel_replays_timeouts() {
        let mut channel = ScriptedChannel::new(vec![Some(b"ab".to_vec()), None]);
        let mut buf = [0u8; 4];
        assert_eq!(channel.read(&mut buf).unwrap(), 2);
        assert_eq!(channel.read(&mut buf).unwrap(), 0);
        assert_eq!(channel.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_millis(15));
        assert_eq!(clock.now(), Duration::from_millis(15));
    }
}
