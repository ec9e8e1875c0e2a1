use std::fmt;
use std::io;

use debugcart_session::{LoaderError, ProtocolError};
use debugcart_transport::TransportError;

// Exit codes shared by every subcommand.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Open { ref source, .. } | TransportError::Configure { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn protocol_error(context: &str, err: ProtocolError) -> CliError {
    match err {
        ProtocolError::Transport(err) => transport_error(context, err),
        ProtocolError::Timeout { .. } | ProtocolError::Incomplete { .. } => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ProtocolError::LengthOutOfRange { .. } | ProtocolError::AddressOverflow { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        ProtocolError::SyncLost { .. } => {
            CliError::new(HEALTH_CHECK_FAILED, format!("{context}: {err}"))
        }
        ProtocolError::Busy => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn loader_error(context: &str, err: LoaderError) -> CliError {
    match err {
        LoaderError::FileNotFound { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        LoaderError::Io { source, path } => {
            io_error(&format!("{context}: {}", path.display()), source)
        }
        LoaderError::Session(err) => protocol_error(context, err),
        LoaderError::Transfer {
            written,
            address,
            source,
        } => protocol_error(
            &format!("{context} at {address:#x} after {written} bytes"),
            source,
        ),
    }
}
