use std::sync::{Arc, Mutex, TryLockError};

use tracing::debug;

use crate::clock::SystemClock;
use crate::error::ProtocolError;
use crate::session::DeviceSession;

/// A cloneable handle to one device session.
///
/// The protocol carries no request identifiers, so two callers interleaving
/// commands on one channel would corrupt both exchanges. Every access goes
/// through [`with_session`](Self::with_session), which refuses with
/// [`ProtocolError::Busy`] instead of waiting while another caller holds the
/// session.
pub struct SharedSession<T, C = SystemClock> {
    inner: Arc<Mutex<DeviceSession<T, C>>>,
}

impl<T, C> SharedSession<T, C> {
    pub fn new(session: DeviceSession<T, C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// Fails with [`ProtocolError::Busy`] if another caller is inside
    /// `with_session`, or if a previous caller panicked mid-operation and
    /// left the device state unknown.
    pub fn with_session<R, E, F>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&mut DeviceSession<T, C>) -> std::result::Result<R, E>,
        E: From<ProtocolError>,
    {
        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                debug!("session busy");
                return Err(ProtocolError::Busy.into());
            }
            Err(TryLockError::Poisoned(_)) => return Err(ProtocolError::Busy.into()),
        };
        f(&mut guard)
    }

    /// Whether another caller currently holds the session.
    pub fn is_busy(&self) -> bool {
        matches!(self.inner.try_lock(), Err(TryLockError::WouldBlock))
    }

    /// Recover the session once every other handle has been dropped.
    pub fn try_into_inner(self) -> std::result::Result<DeviceSession<T, C>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl<T, C> Clone for SharedSession<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
