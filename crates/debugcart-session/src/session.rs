use std::io::{Read, Write};
use std::time::Duration;

use debugcart_proto::Command;
use debugcart_transport::write_exact;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;

/// Configuration for a device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Overall budget for one block read to deliver all of its bytes.
    pub transfer_timeout: Duration,
    /// Pause between read attempts while a block read is incomplete.
    pub poll_interval: Duration,
    /// Fail a block write when the sync probe after it is not echoed.
    /// When false the probe is advisory and only logged.
    pub verify_writes: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transfer_timeout: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(10),
            verify_writes: false,
        }
    }
}

/// Progress of the most recent block transfer.
///
/// After a failure, [`DeviceSession::failed_at`] holds the last stage the
/// transfer reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    AddressSet,
    ModeSet,
    CounterSet,
    /// The read or write command byte is on the wire.
    CommandSent,
    /// Payload is moving: some read bytes have arrived, or the whole write
    /// payload was sent and the sync check is pending.
    Transferring,
    Done,
    Failed,
}

/// One open connection to one device.
///
/// Holds the byte channel exclusively, together with host-side shadows of the
/// device's address and repeat counter registers. The shadows always hold the
/// last value sent; the device is never queried to confirm them.
pub struct DeviceSession<T, C = SystemClock> {
    pub(crate) channel: T,
    pub(crate) clock: C,
    pub(crate) config: SessionConfig,
    pub(crate) address: u32,
    pub(crate) repeat_counter: u16,
    pub(crate) state: TransferState,
    pub(crate) failed_at: Option<TransferState>,
}

impl<T: Read + Write> DeviceSession<T> {
    /// Create a session over `channel` with default configuration.
    pub fn new(channel: T) -> Self {
        Self::with_config(channel, SessionConfig::default())
    }

    /// Create a session over `channel` with explicit configuration.
    pub fn with_config(channel: T, config: SessionConfig) -> Self {
        Self::with_clock(channel, config, SystemClock::new())
    }
}

impl<T: Read + Write, C: Clock> DeviceSession<T, C> {
    /// Create a session that measures transfer deadlines with `clock`.
    pub fn with_clock(channel: T, config: SessionConfig, clock: C) -> Self {
        Self {
            channel,
            clock,
            config,
            address: 0,
            repeat_counter: 0,
            state: TransferState::Idle,
            failed_at: None,
        }
    }

    /// Write one encoded command to the channel.
    pub(crate) fn send(&mut self, command: Command, bytes: &[u8]) -> Result<()> {
        debug!(%command, len = bytes.len(), "sending command");
        write_exact(&mut self.channel, bytes)?;
        Ok(())
    }
}

impl<T, C> DeviceSession<T, C> {
    /// Last address sent to the device.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Last repeat counter value sent to the device.
    pub fn repeat_counter(&self) -> u16 {
        self.repeat_counter
    }

    /// Progress of the most recent block transfer.
    pub fn transfer_state(&self) -> TransferState {
        self.state
    }

    /// Stage the most recent transfer had reached when it failed. `None`
    /// unless the transfer state is [`TransferState::Failed`].
    pub fn failed_at(&self) -> Option<TransferState> {
        self.failed_at
    }

    /// Current session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.channel
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.channel
    }

    /// Consume the session and return the channel.
    pub fn into_inner(self) -> T {
        self.channel
    }
}

impl<T, C> std::fmt::Debug for DeviceSession<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("address", &format_args!("{:#x}", self.address))
            .field("repeat_counter", &self.repeat_counter)
            .field("state", &self.state)
            .field("failed_at", &self.failed_at)
            .field("config", &self.config)
            .finish()
    }
}
