use std::io::{Read, Write};

use debugcart_proto::{encode_sync, Command, SYNC_PROBE};
use debugcart_transport::read_up_to;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::session::DeviceSession;

impl<T: Read + Write, C: Clock> DeviceSession<T, C> {
    /// Send the sync probe and check that the device echoes it.
    ///
    /// Returns `Ok(false)` when no byte arrives before the read timeout or
    /// the reply differs from the probe. Only channel faults are errors.
    /// Never retried; the caller decides whether to abort or carry on.
    pub fn try_sync(&mut self) -> Result<bool> {
        self.send(Command::Sync, &encode_sync())?;

        let mut reply = [0u8; 1];
        let received = read_up_to(&mut self.channel, &mut reply)?;
        if received == 0 {
            warn!("timeout waiting for sync echo");
            return Ok(false);
        }

        let synced = reply[0] == SYNC_PROBE;
        if synced {
            debug!("device in sync");
        } else {
            warn!(reply = reply[0], "unexpected sync reply");
        }
        Ok(synced)
    }
}
