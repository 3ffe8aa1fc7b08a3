//! # Geopulse IPC
//!
//! Lock-free SPMC shared-memory transport between the location daemon and
//! its adapters. One producer publishes `(WorldState, ContextFrame)` pairs
//! into a 1024-slot ring; any number of readers snapshot the latest entry
//! without locks.
//!
//! Tearing is detected with a per-slot odd/even sequence counter: the
//! producer marks a slot odd before copying the payload and even after, so
//! a reader that observes an odd or changed sequence discards its copy and
//! retries. Production is wait-free; consumption is obstruction-free.

pub mod layout;
pub mod reader;
pub mod segment;
pub mod writer;

pub use layout::{RING_SLOTS, SEGMENT_NAME, SEGMENT_SIZE};
pub use reader::StateReader;
pub use segment::{segment_path, IpcError, Segment};
pub use writer::StateWriter;
