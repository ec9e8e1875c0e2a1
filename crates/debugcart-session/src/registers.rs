use std::io::{Read, Write};

use debugcart_proto::{
    decode_counter_response, decode_le_u32, encode_get_counter, encode_set_address,
    encode_set_counter, encode_set_mode, Command, GET_ADDRESS_TAGS,
};
use debugcart_transport::read_up_to;

use crate::clock::Clock;
use crate::error::{ProtocolError, Result};
use crate::session::DeviceSession;

impl<T: Read + Write, C: Clock> DeviceSession<T, C> {
    /// Point the device's address register at `addr`.
    ///
    /// Fire-and-forget: the device sends no acknowledgment. The host-side
    /// shadow is updated once the command has been written.
    pub fn set_address(&mut self, addr: u32) -> Result<()> {
        self.send(Command::SetAddress, &encode_set_address(addr))?;
        self.address = addr;
        Ok(())
    }

    /// Read the device's address register, one byte per round-trip.
    ///
    /// Fails with [`ProtocolError::Incomplete`] as soon as one round-trip
    /// goes unanswered; a partially assembled value is never returned.
    /// The host-side shadow is left unchanged.
    pub fn get_address(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        for (index, tag) in GET_ADDRESS_TAGS.iter().enumerate() {
            self.send(Command::GetAddress(index as u8), &[*tag])?;
            let received = read_up_to(&mut self.channel, &mut bytes[index..=index])?;
            if received == 0 {
                return Err(ProtocolError::Incomplete {
                    command: Command::GetAddress(index as u8),
                    expected: bytes.len(),
                    received: index,
                });
            }
        }
        Ok(decode_le_u32(bytes))
    }

    /// Set the device's repeat counter, which bounds the next block transfer.
    pub fn set_repeat_counter(&mut self, len: u16) -> Result<()> {
        self.send(Command::SetCounter, &encode_set_counter(len))?;
        self.repeat_counter = len;
        Ok(())
    }

    /// Read the device's repeat counter.
    pub fn get_repeat_counter(&mut self) -> Result<u16> {
        self.send(Command::GetCounter, &encode_get_counter())?;

        let mut reply = [0u8; 2];
        let received = read_up_to(&mut self.channel, &mut reply)?;
        if received < reply.len() {
            return Err(ProtocolError::Incomplete {
                command: Command::GetCounter,
                expected: reply.len(),
                received,
            });
        }
        Ok(decode_counter_response(reply))
    }

    /// Select auto-increment addressing. Required before every block transfer.
    pub fn enable_auto_increment(&mut self) -> Result<()> {
        self.send(Command::SetMode, &encode_set_mode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDevice, ScriptedChannel};

    #[test]
    fn set_address_wire_bytes_and_shadow() {
        let mut session = DeviceSession::new(ScriptedChannel::default());
        session.set_address(0x0012_3456).unwrap();
        assert_eq!(session.get_ref().written, b"A\x56B\x34C\x12D\x00");
        assert_eq!(session.address(), 0x0012_3456);
    }

    #[test]
    fn set_then_get_address() {
        let mut session = DeviceSession::new(FakeDevice::new());
        session.set_address(0x0012_3456).unwrap();
        assert_eq!(session.get_address().unwrap(), 0x0012_3456);
    }

    #[test]
    fn get_address_reads_device_value_without_touching_shadow() {
        let mut device = FakeDevice::new();
        device.set_registers(0xDEAD_BEEF, 0);
        let mut session = DeviceSession::new(device);
        assert_eq!(session.get_address().unwrap(), 0xDEAD_BEEF);
        assert_eq!(session.address(), 0);
        assert_eq!(
            session.get_ref().commands(),
            &[
                Command::GetAddress(0),
                Command::GetAddress(1),
                Command::GetAddress(2),
                Command::GetAddress(3)
            ]
        );
    }

    #[test]
    fn get_address_one_byte_per_round_trip() {
        let script = vec![Some(vec![0x56]), Some(vec![0x34]), Some(vec![0x12]), Some(vec![0x00])];
        let mut session = DeviceSession::new(ScriptedChannel::new(script));
        assert_eq!(session.get_address().unwrap(), 0x0012_3456);
        assert_eq!(session.get_ref().written, b"EFGH");
    }

    #[test]
    fn get_address_incomplete_on_missing_byte() {
        let script = vec![Some(vec![0x56]), Some(vec![0x34]), None];
        let mut session = DeviceSession::new(ScriptedChannel::new(script));
        let err = session.get_address().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Incomplete {
                command: Command::GetAddress(2),
                expected: 4,
                received: 2
            }
        ));
        // The request stops at the unanswered round-trip.
        assert_eq!(session.get_ref().written, b"EFG");
    }

    #[test]
    fn set_then_get_repeat_counter() {
        let mut session = DeviceSession::new(FakeDevice::new());
        session.set_repeat_counter(0x2112).unwrap();
        assert_eq!(session.repeat_counter(), 0x2112);
        assert_eq!(session.get_repeat_counter().unwrap(), 0x2112);
    }

    #[test]
    fn set_repeat_counter_wire_bytes() {
        let mut session = DeviceSession::new(ScriptedChannel::default());
        session.set_repeat_counter(1024).unwrap();
        assert_eq!(session.get_ref().written, b"T\x00\x04");
    }

    #[test]
    fn get_repeat_counter_incomplete() {
        let mut session = DeviceSession::new(ScriptedChannel::new(vec![Some(vec![0x12]), None]));
        let err = session.get_repeat_counter().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Incomplete {
                command: Command::GetCounter,
                expected: 2,
                received: 1
            }
        ));
    }

    #[test]
    fn get_repeat_counter_assembles_split_reply() {
        let script = vec![Some(vec![0x12]), Some(vec![0x21])];
        let mut session = DeviceSession::new(ScriptedChannel::new(script));
        assert_eq!(session.get_repeat_counter().unwrap(), 0x2112);
        assert_eq!(session.get_ref().written, b"P");
    }

    #[test]
    fn enable_auto_increment_sends_mode_select() {
        let mut session = DeviceSession::new(ScriptedChannel::default());
        session.enable_auto_increment().unwrap();
        assert_eq!(session.get_ref().written, b"M3");
    }
}
