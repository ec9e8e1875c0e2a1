use std::fmt;

/// Sync probe byte. The device echoes it back.
pub const SYNC_PROBE: u8 = b'.';
/// Tags at the even offsets of the set-address command.
pub const SET_ADDRESS_TAGS: [u8; 4] = *b"ABCD";
/// Tags requesting address bytes 0..3, one round-trip each.
pub const GET_ADDRESS_TAGS: [u8; 4] = *b"EFGH";
/// Mode select: auto-increment addressing.
pub const SET_MODE: [u8; 2] = *b"M3";
/// Set repeat counter, followed by the u16 count (LE).
pub const SET_COUNTER: u8 = b'T';
/// Read back the repeat counter (2 bytes LE).
pub const GET_COUNTER: u8 = b'P';
/// Block read of `counter` bytes.
pub const BLOCK_READ: u8 = b'@';
/// Block write of `counter` bytes.
pub const BLOCK_WRITE: u8 = b'!';

/// Largest payload moved by one block write.
pub const MAX_CHUNK_SIZE: usize = 1024;

/// Device commands, identified by their leading tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Sync,
    SetAddress,
    /// Read one byte of the address register (0 = least significant).
    GetAddress(u8),
    SetMode,
    SetCounter,
    GetCounter,
    BlockRead,
    BlockWrite,
}

impl Command {
    /// Identify the command that starts with `tag`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            SYNC_PROBE => Some(Self::Sync),
            b'A' => Some(Self::SetAddress),
            b'E'..=b'H' => Some(Self::GetAddress(tag - b'E')),
            b'M' => Some(Self::SetMode),
            SET_COUNTER => Some(Self::SetCounter),
            GET_COUNTER => Some(Self::GetCounter),
            BLOCK_READ => Some(Self::BlockRead),
            BLOCK_WRITE => Some(Self::BlockWrite),
            _ => None,
        }
    }

    /// The leading tag byte of this command.
    pub fn tag(self) -> u8 {
        match self {
            Self::Sync => SYNC_PROBE,
            Self::SetAddress => SET_ADDRESS_TAGS[0],
            Self::GetAddress(index) => GET_ADDRESS_TAGS[usize::from(index & 3)],
            Self::SetMode => SET_MODE[0],
            Self::SetCounter => SET_COUNTER,
            Self::GetCounter => GET_COUNTER,
            Self::BlockRead => BLOCK_READ,
            Self::BlockWrite => BLOCK_WRITE,
        }
    }

    /// Bytes sent for this command, excluding any block write payload.
    pub fn wire_len(self) -> usize {
        match self {
            Self::SetAddress => 8,
            Self::SetMode => 2,
            Self::SetCounter => 3,
            _ => 1,
        }
    }

    /// Short lowercase name, used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::SetAddress => "set-address",
            Self::GetAddress(_) => "get-address",
            Self::SetMode => "set-mode",
            Self::SetCounter => "set-counter",
            Self::GetCounter => "get-counter",
            Self::BlockRead => "block-read",
            Self::BlockWrite => "block-write",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
