/// Errors that can occur while decoding command bytes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer has the wrong length for the command.
    #[error("invalid length for {command} ({actual} bytes, expected {expected})")]
    InvalidLength {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A fixed tag byte does not match the command layout.
    #[error("invalid tag at offset {offset} (expected {expected:#04x}, found {found:#04x})")]
    InvalidTag {
        offset: usize,
        expected: u8,
        found: u8,
    },
}

pub type Result<T> = std::result::Result<T, CodecError>;
