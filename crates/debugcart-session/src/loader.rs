use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use debugcart_proto::MAX_CHUNK_SIZE;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::LoaderError;
use crate::session::DeviceSession;
use crate::transfer::{check_span, chunk_spans};

/// File bytes per device segment in a tight GROM image.
pub const GROM_TIGHT_SEGMENT: usize = 6 * 1024;
/// Device address step between segments of a tight GROM image.
pub const GROM_TIGHT_STRIDE: usize = 8 * 1024;

/// Load address used when nothing in the file name says otherwise.
pub const DEFAULT_ROM_ADDRESS: u32 = 0x4_0000;

/// How file bytes map onto device addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadLayout {
    /// Byte `i` of the file goes to `start + i`.
    #[default]
    Linear,
    /// Each 6 KiB of the file goes to the start of the next 8 KiB slot.
    /// GROM images are often stored without the 2 KiB padding per slot.
    GromTight,
}

impl LoadLayout {
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::GromTight => "grom-tight",
        }
    }

    /// `(segment, stride)`: file bytes per contiguous device run, and the
    /// address step from one run to the next.
    fn geometry(self) -> (usize, usize) {
        match self {
            Self::Linear => (MAX_CHUNK_SIZE, MAX_CHUNK_SIZE),
            Self::GromTight => (GROM_TIGHT_SEGMENT, GROM_TIGHT_STRIDE),
        }
    }

    /// Device bytes spanned by a file of `len` bytes, from the first
    /// address written to one past the last.
    pub fn footprint(self, len: u64) -> u64 {
        if len == 0 {
            return 0;
        }
        let (segment, stride) = self.geometry();
        let before_last = (len - 1) / segment as u64;
        before_last * stride as u64 + (len - before_last * segment as u64)
    }
}

/// Options for loading a file into device memory.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Stop after this many bytes even if the file is longer.
    pub max_len: Option<u64>,
    /// Address mapping for the file contents.
    pub layout: LoadLayout,
}

/// Where a ROM image belongs, as derived from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomPlacement {
    pub address: u32,
    pub layout: LoadLayout,
}

// Later entries win, so a suffix overrides a directory or name prefix.
const ROM_PREFIXES: [(&str, u32); 3] = [("cart", 0x4_0000), ("grom", 0x1_6000), ("dsr", 0x4000)];

const ROM_SUFFIXES: [(&str, u32); 9] = [
    ("8.bin", 0x4_0000),
    ("c.bin", 0x4_0000),
    ("d.bin", 0x4_2000),
    ("g.bin", 0x1_6000),
    ("g3.bin", 0x1_6000),
    ("g4.bin", 0x1_8000),
    ("g5.bin", 0x1_A000),
    ("g6.bin", 0x1_C000),
    ("g7.bin", 0x1_E000),
];

const GROM_TIGHT_SUFFIX: &str = "6k.bin";

/// Pick the load address and layout for a TI-99/4A ROM image by name.
///
/// The parent directory or file name prefix (`cart`, `grom`, `dsr`) sets a
/// base, and the conventional name suffixes (`c.bin`, `d.bin`, `g.bin`,
/// `g3.bin`..`g7.bin`, `8.bin`) refine it. `6k.bin` marks a tight GROM image
/// at 0x16000. Anything else loads linearly at [`DEFAULT_ROM_ADDRESS`].
pub fn rom_placement(path: &Path) -> RomPlacement {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut placement = RomPlacement {
        address: DEFAULT_ROM_ADDRESS,
        layout: LoadLayout::Linear,
    };
    for (prefix, address) in ROM_PREFIXES {
        if parent.starts_with(prefix) || name.starts_with(prefix) {
            placement.address = address;
        }
    }
    for (suffix, address) in ROM_SUFFIXES {
        if name.ends_with(suffix) {
            placement.address = address;
        }
    }
    if name.ends_with(GROM_TIGHT_SUFFIX) {
        placement = RomPlacement {
            address: 0x1_6000,
            layout: LoadLayout::GromTight,
        };
    }
    placement
}

impl<T: Read + Write, C: Clock> DeviceSession<T, C> {
    /// Stream the file at `path` into device memory starting at `start`.
    ///
    /// The file is raw binary and is written verbatim in chunks of up to
    /// [`MAX_CHUNK_SIZE`] bytes, advancing the address by each chunk. Returns
    /// the total number of bytes written.
    ///
    /// Fails fast: the first failed block write aborts the load with
    /// [`LoaderError::Transfer`], which reports the bytes already written.
    /// Nothing is rolled back on the device.
    pub fn load_file(&mut self, path: impl AsRef<Path>, start: u32) -> Result<u64, LoaderError> {
        self.load_file_with(path, start, &LoadOptions::default())
    }

    /// Load a file with explicit options.
    ///
    /// For a regular file the whole device range is checked before anything
    /// is sent. Other files are checked one segment at a time.
    pub fn load_file_with(
        &mut self,
        path: impl AsRef<Path>,
        start: u32,
        options: &LoadOptions,
    ) -> Result<u64, LoaderError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|source| open_error(path, source))?;
        let io_error = |source: std::io::Error| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        };

        let limit = options.max_len.unwrap_or(u64::MAX);
        let metadata = file.metadata().map_err(io_error)?;
        if metadata.is_file() {
            let len = metadata.len().min(limit);
            check_span(u64::from(start), options.layout.footprint(len))?;
        }

        let (segment_len, stride) = options.layout.geometry();
        let mut segment = vec![0u8; segment_len];
        let mut cursor = u64::from(start);
        let mut written = 0u64;

        while written < limit {
            let want = (limit - written).min(segment_len as u64) as usize;
            let filled = fill(&mut file, &mut segment[..want]).map_err(io_error)?;
            if filled == 0 {
                break;
            }

            let mut offset = 0usize;
            for (address, len) in chunk_spans(cursor, filled as u64)? {
                self.write_block(&segment[offset..offset + len], address)
                    .map_err(|source| LoaderError::Transfer {
                        written,
                        address,
                        source,
                    })?;
                offset += len;
                written += len as u64;
            }
            debug!(address = cursor, written, "segment loaded");

            if filled < want {
                break;
            }
            cursor += stride as u64;
        }

        info!(
            path = %path.display(),
            start,
            written,
            layout = options.layout.name(),
            "file loaded"
        );
        Ok(written)
    }

    /// Load a ROM image at the address and layout its name calls for.
    pub fn load_rom_auto(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<(RomPlacement, u64), LoaderError> {
        let path = path.as_ref();
        let placement = rom_placement(path);
        let options = LoadOptions {
            max_len: None,
            layout: placement.layout,
        };
        let written = self.load_file_with(path, placement.address, &options)?;
        Ok((placement, written))
    }

    /// Save `length` bytes of device memory starting at `start` to a new
    /// file at `path`, overwriting any existing file.
    ///
    /// Reads in chunks of up to [`MAX_CHUNK_SIZE`] bytes and fails fast like
    /// [`load_file`](Self::load_file). Returns the number of bytes saved. A
    /// range past the end of the address space is refused before the file
    /// is created.
    pub fn dump_to_file(
        &mut self,
        path: impl AsRef<Path>,
        start: u32,
        length: u64,
    ) -> Result<u64, LoaderError> {
        let path = path.as_ref();
        let spans = chunk_spans(u64::from(start), length)?;
        let mut file = File::create(path).map_err(|source| open_error(path, source))?;
        let io_error = |source: std::io::Error| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut buf = [0u8; MAX_CHUNK_SIZE];
        let mut saved = 0u64;
        for (address, len) in spans {
            self.read_block(&mut buf[..len], address)
                .map_err(|source| LoaderError::Transfer {
                    written: saved,
                    address,
                    source,
                })?;
            file.write_all(&buf[..len]).map_err(io_error)?;
            saved += len as u64;
        }
        file.flush().map_err(io_error)?;

        info!(path = %path.display(), start, saved, "memory dumped");
        Ok(saved)
    }
}

/// Read until `buf` is full or the file ends.
fn fill(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

fn open_error(path: &Path, source: std::io::Error) -> LoaderError {
    if source.kind() == ErrorKind::NotFound {
        LoaderError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        LoaderError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
