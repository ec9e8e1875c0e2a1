//! Device session management for the debugcart link.
//!
//! This is the layer callers use. Open a byte channel, wrap it in a
//! [`DeviceSession`], and read or write device memory:
//!
//! ```no_run
//! use debugcart_session::DeviceSession;
//! use debugcart_transport::SerialPort;
//!
//! let port = SerialPort::open("/dev/ttyACM0", 230_400)?;
//! let mut session = DeviceSession::new(port);
//! if session.try_sync()? {
//!     let written = session.load_file("cart.bin", 0x4_0000)?;
//!     println!("loaded {written} bytes");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Every operation is a blocking round-trip on one exclusively owned channel.
//! Nothing is retried automatically.

pub mod clock;
pub mod error;
pub mod handshake;
pub mod loader;
pub mod registers;
pub mod session;
pub mod shared;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use error::{LoaderError, ProtocolError, Result};
pub use loader::{rom_placement, LoadLayout, LoadOptions, RomPlacement};
pub use session::{DeviceSession, SessionConfig, TransferState};
pub use shared::SharedSession;
