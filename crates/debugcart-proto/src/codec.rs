use bytes::{BufMut, Bytes, BytesMut};

use crate::command::{
    BLOCK_READ, BLOCK_WRITE, GET_COUNTER, SET_ADDRESS_TAGS, SET_COUNTER, SET_MODE, SYNC_PROBE,
};
use crate::error::{CodecError, Result};

/// Set-address command: 4 tags interleaved with 4 address bytes = 8 bytes.
pub const SET_ADDRESS_LEN: usize = 8;
/// Set-counter command: tag + u16 = 3 bytes.
pub const SET_COUNTER_LEN: usize = 3;

/// Encode the sync probe.
pub fn encode_sync() -> Bytes {
    Bytes::from_static(&[SYNC_PROBE])
}

/// Encode a set-address command.
///
/// Wire format:
/// ```text
/// offset  0    1    2    3    4    5    6    7
///        'A' a0   'B' a1   'C' a2   'D' a3      (a0 = least significant)
/// ```
pub fn encode_set_address(addr: u32) -> Bytes {
    let mut dst = BytesMut::with_capacity(SET_ADDRESS_LEN);
    for (tag, byte) in SET_ADDRESS_TAGS.iter().zip(addr.to_le_bytes()) {
        dst.put_u8(*tag);
        dst.put_u8(byte);
    }
    dst.freeze()
}

/// Decode a set-address command back into the address it carries.
pub fn decode_set_address(src: &[u8]) -> Result<u32> {
    check_len("set-address", src, SET_ADDRESS_LEN)?;

    let mut addr = [0u8; 4];
    for (i, tag) in SET_ADDRESS_TAGS.iter().enumerate() {
        check_tag(src, i * 2, *tag)?;
        addr[i] = src[i * 2 + 1];
    }
    Ok(u32::from_le_bytes(addr))
}

/// Encode the auto-increment mode select.
pub fn encode_set_mode() -> Bytes {
    Bytes::from_static(&SET_MODE)
}

/// Encode a set-counter command: `T`, then `len` little-endian.
pub fn encode_set_counter(len: u16) -> Bytes {
    let mut dst = BytesMut::with_capacity(SET_COUNTER_LEN);
    dst.put_u8(SET_COUNTER);
    dst.put_u16_le(len);
    dst.freeze()
}

/// Decode a set-counter command back into its length operand.
pub fn decode_set_counter(src: &[u8]) -> Result<u16> {
    check_len("set-counter", src, SET_COUNTER_LEN)?;
    check_tag(src, 0, SET_COUNTER)?;
    Ok(u16::from_le_bytes([src[1], src[2]]))
}

/// Encode the read-counter request.
pub fn encode_get_counter() -> Bytes {
    Bytes::from_static(&[GET_COUNTER])
}

/// Decode the 2-byte response to a read-counter request.
pub fn decode_counter_response(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// Reassemble the four address bytes returned by the `EFGH` round-trips.
pub fn decode_le_u32(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

/// Encode the block-read command byte.
pub fn encode_block_read() -> Bytes {
    Bytes::from_static(&[BLOCK_READ])
}

/// Encode the block-write command byte. The payload follows separately.
pub fn encode_block_write() -> Bytes {
    Bytes::from_static(&[BLOCK_WRITE])
}

fn check_len(command: &'static str, src: &[u8], expected: usize) -> Result<()> {
    if src.len() != expected {
        return Err(CodecError::InvalidLength {
            command,
            expected,
            actual: src.len(),
        });
    }
    Ok(())
}

fn check_tag(src: &[u8], offset: usize, expected: u8) -> Result<()> {
    if src[offset] != expected {
        return Err(CodecError::InvalidTag {
            offset,
            expected,
            found: src[offset],
        });
    }
    Ok(())
}
