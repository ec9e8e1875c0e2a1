//! Command encoding for the debugcart memory access protocol.
//!
//! The device speaks an unframed protocol of single-byte ASCII tags, some
//! followed by little-endian operands:
//! - `.` sync probe, echoed back
//! - `A?B?C?D?` set address (operand bytes interleaved with tags)
//! - `E` `F` `G` `H` read back one address byte each
//! - `M3` enable auto-increment addressing
//! - `T` + u16 set the repeat counter, `P` read it back
//! - `@` block read, `!` block write
//!
//! Everything here is pure: encoders return freshly owned buffers and
//! decoders validate their input. No I/O happens in this crate.

pub mod codec;
pub mod command;
pub mod error;

pub use codec::{
    decode_counter_response, decode_le_u32, decode_set_address, decode_set_counter,
    encode_block_read, encode_block_write, encode_get_counter, encode_set_address,
    encode_set_counter, encode_set_mode, encode_sync, SET_ADDRESS_LEN, SET_COUNTER_LEN,
};
pub use command::{
    Command, BLOCK_READ, BLOCK_WRITE, GET_ADDRESS_TAGS, GET_COUNTER, MAX_CHUNK_SIZE,
    SET_ADDRESS_TAGS, SET_COUNTER, SET_MODE, SYNC_PROBE,
};
pub use error::{CodecError, Result};
