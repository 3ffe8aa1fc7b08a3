//! Fixed segment layout.
//!
//! ```text
//! offset 0                      256                               1 MiB
//! +------------------------------+--------------------------------+
//! | SegmentHeader (256 bytes)    | 1024 x RingEntry (976 bytes)   |
//! +------------------------------+--------------------------------+
//! ```
//!
//! The header and every slot live at fixed offsets, so both processes cast
//! the mapping directly. Payload fields sit behind `UnsafeCell`: they are
//! deliberately racy and the per-slot sequence counter is the only
//! consistency mechanism.

use geopulse_core::{ContextFrame, WorldState};
use std::cell::UnsafeCell;
use std::mem::size_of;
use std::sync::atomic::{AtomicU32, AtomicU64};

/// Well-known segment name shared by daemon and adapters.
pub const SEGMENT_NAME: &str = "s2sgeo_shm";

/// Total mapped size.
pub const SEGMENT_SIZE: usize = 1024 * 1024;

/// Number of ring slots.
pub const RING_SLOTS: usize = 1024;

/// Header bytes reserved at the start of the segment.
pub const HEADER_SIZE: usize = 256;

/// Byte offset of the first ring slot.
pub const RING_OFFSET: usize = HEADER_SIZE;

pub const MAGIC: &[u8; 8] = b"S2SGEO1\0";
pub const VERSION: u32 = 1;

/// Width of the active-plugin name field (NUL-terminated).
pub const PLUGIN_NAME_LEN: usize = 64;

/// Control block at the start of the segment.
#[repr(C)]
pub struct SegmentHeader {
    pub magic: [u8; 8],
    pub version: u32,
    /// Next slot the producer will write.
    pub write_index: AtomicU32,
    /// Advisory only; not part of the protocol.
    pub read_index: AtomicU32,
    /// Bumped once per publish; total order across processes.
    pub global_sequence: AtomicU32,
    pub producer_alive: AtomicU32,
    /// Odd/even guard for the plugin-name field below.
    pub config_seq: AtomicU32,
    pub active_plugin: UnsafeCell<[u8; PLUGIN_NAME_LEN]>,
    /// `f64::to_bits` of the accuracy level in [0.0, 1.0].
    pub accuracy_bits: AtomicU64,
    pub total_updates: AtomicU64,
    pub total_context_updates: AtomicU64,
    _reserved: [u8; 136],
}

const _: () = assert!(size_of::<SegmentHeader>() == HEADER_SIZE);

/// One ring slot: a sequence counter plus the byte-copied payload.
///
/// Odd sequence = write in progress; even = stable. The counter is the sole
/// tearing-detection mechanism.
#[repr(C)]
pub struct RingEntry {
    pub seq: AtomicU32,
    _pad: u32,
    pub state: UnsafeCell<WorldState>,
    pub context: UnsafeCell<ContextFrame>,
}

const _: () = assert!(size_of::<RingEntry>() == 976);
const _: () = assert!(RING_OFFSET + RING_SLOTS * size_of::<RingEntry>() <= SEGMENT_SIZE);
