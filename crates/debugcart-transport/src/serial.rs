use std::fs::OpenOptions;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::SerialStream;

/// Baud rate used when none is configured.
pub const DEFAULT_BAUD_RATE: u32 = 230_400;
/// Baud rate substituted for unsupported requests.
pub const FALLBACK_BAUD_RATE: u32 = 9_600;
/// Baud rates the line can be set to.
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [4_800, 9_600, 19_200, 38_400, 115_200, 230_400];

/// Line settings applied when a serial device is opened.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line speed. Unsupported values fall back to [`FALLBACK_BAUD_RATE`].
    pub baud_rate: u32,
    /// Per-read timeout. Default: 100 ms.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Opens serial devices for the debugcart link.
pub struct SerialPort;

impl SerialPort {
    /// Open `path` at `baud_rate` with the default 100 ms read timeout.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> Result<SerialStream> {
        let config = SerialConfig {
            baud_rate,
            ..SerialConfig::default()
        };
        Self::open_with_config(path, &config)
    }

    /// Open `path` and switch the line to raw binary mode.
    ///
    /// Pending input and output are discarded first. A failed discard is only
    /// logged.
    pub fn open_with_config(path: impl AsRef<Path>, config: &SerialConfig) -> Result<SerialStream> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;
        let fd = file.as_raw_fd();

        // SAFETY: `fd` is an open descriptor owned by `file` for this whole scope.
        if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
            warn!(?path, error = %std::io::Error::last_os_error(), "tcflush failed");
        }

        configure_raw(fd, config).map_err(|source| configure_error(&path, source))?;

        info!(?path, baud_rate = effective_baud_rate(config.baud_rate), "opened serial port");
        Ok(SerialStream::from_file(file, path))
    }
}

/// The baud rate that will actually be applied for a requested rate.
pub fn effective_baud_rate(requested: u32) -> u32 {
    if SUPPORTED_BAUD_RATES.contains(&requested) {
        requested
    } else {
        FALLBACK_BAUD_RATE
    }
}

fn speed_constant(baud_rate: u32) -> libc::speed_t {
    match baud_rate {
        4_800 => libc::B4800,
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        other => {
            warn!(
                baud_rate = other,
                fallback = FALLBACK_BAUD_RATE,
                "unsupported baud rate"
            );
            libc::B9600
        }
    }
}

/// Tenths of a second, rounded up, capped at the 8-bit VTIME range.
fn vtime_for(timeout: Duration) -> libc::cc_t {
    let tenths = timeout.as_millis().div_ceil(100);
    tenths.min(libc::cc_t::MAX as u128) as libc::cc_t
}

fn read_attrs(fd: RawFd) -> std::io::Result<libc::termios> {
    // SAFETY: termios is a plain C struct; all-zero is a valid bit pattern and
    // it is fully overwritten by tcgetattr on success.
    let mut options: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `options` is a valid writable termios and `fd` is open.
    if unsafe { libc::tcgetattr(fd, &mut options) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(options)
}

fn write_attrs(fd: RawFd, options: &libc::termios) -> std::io::Result<()> {
    // SAFETY: `options` points to an initialized termios and `fd` is open.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, options) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn configure_raw(fd: RawFd, config: &SerialConfig) -> std::io::Result<()> {
    let mut options = read_attrs(fd)?;

    // 8N1, no line editing, no flow control, every byte passed through untouched.
    options.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INPCK
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF);
    options.c_oflag &= !(libc::OPOST | libc::ONLCR | libc::OCRNL);
    options.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    options.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CSTOPB);
    options.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;

    options.c_cc[libc::VTIME] = vtime_for(config.read_timeout);
    options.c_cc[libc::VMIN] = 0;

    let speed = speed_constant(config.baud_rate);
    // SAFETY: `options` is an initialized termios owned by this frame.
    unsafe {
        if libc::cfsetospeed(&mut options, speed) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::cfsetispeed(&mut options, libc::cfgetospeed(&options)) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    write_attrs(fd, &options)?;
    debug!(vtime = options.c_cc[libc::VTIME], "line switched to raw mode");
    Ok(())
}

pub(crate) fn apply_read_timeout(fd: RawFd, timeout: Duration) -> std::io::Result<()> {
    let mut options = read_attrs(fd)?;
    options.c_cc[libc::VTIME] = vtime_for(timeout);
    options.c_cc[libc::VMIN] = 0;
    write_attrs(fd, &options)
}

fn configure_error(path: &Path, source: std::io::Error) -> TransportError {
    TransportError::Configure {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let path = std::env::temp_dir().join(format!(
            "debugcart-missing-{}/ttyACM9",
            std::process::id()
        ));
        let result = SerialPort::open(&path, DEFAULT_BAUD_RATE);
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn test_open_non_tty_rejected() {
        // /dev/null opens fine but has no line discipline to configure.
        let result = SerialPort::open("/dev/null", DEFAULT_BAUD_RATE);
        assert!(matches!(result, Err(TransportError::Configure { .. })));
    }

    #[test]
    fn test_effective_baud_rate() {
        for rate in SUPPORTED_BAUD_RATES {
            assert_eq!(effective_baud_rate(rate), rate);
        }
        assert_eq!(effective_baud_rate(57_600), FALLBACK_BAUD_RATE);
        assert_eq!(effective_baud_rate(0), FALLBACK_BAUD_RATE);
    }

    #[test]
    fn test_unsupported_speed_maps_to_fallback() {
        assert_eq!(speed_constant(1_000_000), libc::B9600);
        assert_eq!(speed_constant(230_400), libc::B230400);
    }

    #[test]
    fn test_vtime_rounding() {
        assert_eq!(vtime_for(Duration::ZERO), 0);
        assert_eq!(vtime_for(Duration::from_millis(1)), 1);
        assert_eq!(vtime_for(Duration::from_millis(100)), 1);
        assert_eq!(vtime_for(Duration::from_millis(250)), 3);
        assert_eq!(vtime_for(Duration::from_secs(60)), 255);
    }

    /// Master side of a fresh pseudo-terminal, plus the slave's path.
    #[cfg(target_os = "linux")]
    fn open_pty() -> (std::fs::File, std::path::PathBuf) {
        use std::ffi::CStr;
        use std::os::fd::FromRawFd;

        // SAFETY: plain libc pty setup; every return value is checked.
        let master = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        assert!(master >= 0, "posix_openpt failed");
        unsafe {
            assert_eq!(libc::grantpt(master), 0);
            assert_eq!(libc::unlockpt(master), 0);
        }
        // SAFETY: ptsname returns a NUL-terminated buffer for a valid master fd.
        let name = unsafe { CStr::from_ptr(libc::ptsname(master)) };
        let path = std::path::PathBuf::from(name.to_string_lossy().into_owned());
        // SAFETY: `master` is an open descriptor owned only by the returned File.
        (unsafe { std::fs::File::from_raw_fd(master) }, path)
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_pty_applies_read_timeout() {
        let (_master, path) = open_pty();
        let config = SerialConfig {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(300),
        };
        let stream = SerialPort::open_with_config(&path, &config).unwrap();
        assert_eq!(stream.path(), path.as_path());

        let options = read_attrs(stream.as_raw_fd()).unwrap();
        assert_eq!(options.c_cc[libc::VTIME], 3);
        assert_eq!(options.c_cc[libc::VMIN], 0);
        assert_eq!(options.c_lflag & libc::ICANON, 0);
        assert_eq!(options.c_cflag & libc::CSIZE, libc::CS8);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_set_read_timeout_bounds_idle_reads() {
        use std::io::Read;
        use std::time::Instant;

        let (_master, path) = open_pty();
        let mut stream = SerialPort::open(&path, DEFAULT_BAUD_RATE).unwrap();
        stream.set_read_timeout(Duration::from_millis(200)).unwrap();
        assert_eq!(read_attrs(stream.as_raw_fd()).unwrap().c_cc[libc::VTIME], 2);

        let started = Instant::now();
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_pty_passes_binary_bytes_untouched() {
        use std::io::{Read, Write};

        let (mut master, path) = open_pty();
        let mut stream = SerialPort::open(&path, DEFAULT_BAUD_RATE).unwrap();

        let payload = [0x00, 0x03, 0x0A, 0x0D, 0x11, 0x13, 0x7F, 0xFF];
        master.write_all(&payload).unwrap();
        let mut buf = [0u8; 8];
        let mut got = 0;
        while got < buf.len() {
            let n = stream.read(&mut buf[got..]).unwrap();
            assert!(n > 0, "timed out after {got} bytes");
            got += n;
        }
        assert_eq!(buf, payload);

        stream.write_all(&payload).unwrap();
        let mut echoed = [0u8; 8];
        master.read_exact(&mut echoed).unwrap();
        assert_eq!(echoed, payload);
    }

    #[test]
    fn test_default_config() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 230_400);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
    }
}
