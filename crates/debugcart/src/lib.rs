//! Host-side access to a debugcart FPGA peripheral over a serial link.
//!
//! debugcart reads and writes the peripheral's memory with a small unframed
//! command protocol, and bulk-loads files into it.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial byte channel and exact-write / bounded-read primitives
//! - [`proto`]: Pure command encoders and decoders
//! - [`session`]: Device session: sync, registers, block transfer, file loading

/// Re-export transport types.
pub mod transport {
    pub use debugcart_transport::*;
}

/// Re-export protocol codec types.
pub mod proto {
    pub use debugcart_proto::*;
}

/// Re-export session types.
pub mod session {
    pub use debugcart_session::*;
}
