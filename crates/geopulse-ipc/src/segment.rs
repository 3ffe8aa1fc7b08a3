use crate::layout::{RingEntry, SegmentHeader, MAGIC, RING_OFFSET, RING_SLOTS, SEGMENT_SIZE, VERSION};
use memmap2::MmapMut;
use std::fs::{self, OpenOptions};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

/// Transport-level failures. Creation/open failures are fatal to their
/// process; everything else in the transport degrades to "no snapshot".
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("failed to create shared memory segment {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open shared memory segment {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("segment {path} carries an unknown magic number")]
    BadMagic { path: PathBuf },

    #[error("segment version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("segment truncated: {found} bytes, need {need}")]
    Truncated { found: usize, need: usize },
}

/// Backing file location for a named segment.
///
/// On Linux the file lives in `/dev/shm`, which is tmpfs, so the mapping is
/// genuine shared memory; elsewhere it falls back to the temp dir.
pub fn segment_path(name: &str) -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/dev/shm").join(name)
    }
    #[cfg(not(target_os = "linux"))]
    {
        std::env::temp_dir().join(name)
    }
}

/// A mapped segment. The producer constructs it with [`Segment::create`]
/// (owning the backing file); consumers use [`Segment::open`].
pub struct Segment {
    path: PathBuf,
    mmap: MmapMut,
    owned: bool,
}

impl Segment {
    /// Create-or-replace the named segment and mark the producer alive.
    ///
    /// Any pre-existing segment of the same name is removed first; a stale
    /// segment from a crashed daemon must not be trusted.
    pub fn create(name: &str) -> Result<Self, IpcError> {
        let path = segment_path(name);
        let _ = fs::remove_file(&path);

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o666);

        let map_err = |source| IpcError::Create {
            path: path.clone(),
            source,
        };
        let file = options.open(&path).map_err(map_err)?;
        file.set_len(SEGMENT_SIZE as u64).map_err(map_err)?;

        let mut mmap = unsafe { MmapMut::map_mut(&file) }.map_err(map_err)?;
        mmap[..8].copy_from_slice(MAGIC);
        mmap[8..12].copy_from_slice(&VERSION.to_le_bytes());

        let segment = Self {
            path,
            mmap,
            owned: true,
        };
        segment
            .header()
            .accuracy_bits
            .store(1.0f64.to_bits(), Ordering::Relaxed);
        segment.header().producer_alive.store(1, Ordering::Release);

        tracing::info!(path = %segment.path.display(), "shared memory segment created");
        Ok(segment)
    }

    /// Open an existing segment read-only by contract.
    ///
    /// The mapping itself is writable (required for mapping shared pages),
    /// but the consumer API never writes through it.
    pub fn open(name: &str) -> Result<Self, IpcError> {
        let path = segment_path(name);
        let map_err = |source| IpcError::Open {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(map_err)?;
        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(map_err)?;

        if mmap.len() < SEGMENT_SIZE {
            return Err(IpcError::Truncated {
                found: mmap.len(),
                need: SEGMENT_SIZE,
            });
        }
        if &mmap[..8] != MAGIC {
            return Err(IpcError::BadMagic { path });
        }
        let version = u32::from_le_bytes([mmap[8], mmap[9], mmap[10], mmap[11]]);
        if version != VERSION {
            return Err(IpcError::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        tracing::debug!(path = %path.display(), "shared memory segment opened");
        Ok(Self {
            path,
            mmap,
            owned: false,
        })
    }

    pub(crate) fn header(&self) -> &SegmentHeader {
        // The mapping is page-aligned and at least SEGMENT_SIZE long, so the
        // header cast is always in bounds and well aligned.
        unsafe { &*self.mmap.as_ptr().cast::<SegmentHeader>() }
    }

    pub(crate) fn slot(&self, index: usize) -> &RingEntry {
        debug_assert!(index < RING_SLOTS);
        unsafe {
            &*self
                .mmap
                .as_ptr()
                .add(RING_OFFSET)
                .cast::<RingEntry>()
                .add(index)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        if self.owned {
            self.header().producer_alive.store(0, Ordering::Release);
            let _ = fs::remove_file(&self.path);
            tracing::info!(path = %self.path.display(), "shared memory segment removed");
        }
    }
}
