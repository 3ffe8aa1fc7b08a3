use crate::layout::{RING_SLOTS, SEGMENT_NAME};
use crate::segment::{IpcError, Segment};
use geopulse_core::state::read_fixed;
use geopulse_core::{ContextFrame, WorldState};
use std::ptr;
use std::sync::atomic::{fence, Ordering};
use std::time::{Duration, Instant};

/// Bounded spins before a snapshot attempt reports "not available".
const SNAPSHOT_RETRIES: usize = 16;

const ALIVE_POLL: Duration = Duration::from_millis(25);

/// Consumer handle. Any number may exist; none of them ever advances
/// producer state.
pub struct StateReader {
    segment: Segment,
}

impl StateReader {
    pub fn open() -> Result<Self, IpcError> {
        Self::open_named(SEGMENT_NAME)
    }

    pub fn open_named(name: &str) -> Result<Self, IpcError> {
        Ok(Self {
            segment: Segment::open(name)?,
        })
    }

    /// Copy out the most recently published `(state, context)` pair.
    ///
    /// `None` means the slot could not be stabilised within the retry
    /// budget (the producer is mid-write, or nothing has been published
    /// yet). That is transient unavailability, not an error; poll again on
    /// the next tick.
    pub fn snapshot(&self) -> Option<(WorldState, ContextFrame)> {
        let header = self.segment.header();

        let write_index = header.write_index.load(Ordering::Acquire) as usize;
        let k = (write_index + RING_SLOTS - 1) % RING_SLOTS;
        let entry = self.segment.slot(k);

        for _ in 0..SNAPSHOT_RETRIES {
            let s1 = entry.seq.load(Ordering::Acquire);
            if s1 == 0 || s1 & 1 == 1 {
                // Never written, or a write is in flight.
                std::hint::spin_loop();
                continue;
            }

            let state = unsafe { ptr::read_volatile(entry.state.get()) };
            let context = unsafe { ptr::read_volatile(entry.context.get()) };

            fence(Ordering::Acquire);
            if entry.seq.load(Ordering::Acquire) == s1 {
                return Some((state, context));
            }
        }
        None
    }

    pub fn producer_alive(&self) -> bool {
        self.segment
            .header()
            .producer_alive
            .load(Ordering::Acquire)
            != 0
    }

    /// Poll the liveness flag for up to `grace`; true once the producer has
    /// signalled. Consumers surface "location service not running" only
    /// after this window lapses.
    pub fn wait_alive(&self, grace: Duration) -> bool {
        let deadline = Instant::now() + grace;
        loop {
            if self.producer_alive() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(ALIVE_POLL);
        }
    }

    /// Currently active plugin name, read under the config seqlock.
    pub fn active_plugin(&self) -> String {
        let header = self.segment.header();
        for _ in 0..SNAPSHOT_RETRIES {
            let s1 = header.config_seq.load(Ordering::Acquire);
            if s1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let raw = unsafe { ptr::read_volatile(header.active_plugin.get()) };
            fence(Ordering::Acquire);
            if header.config_seq.load(Ordering::Acquire) == s1 {
                return read_fixed(&raw);
            }
        }
        String::new()
    }

    pub fn accuracy_level(&self) -> f64 {
        f64::from_bits(
            self.segment
                .header()
                .accuracy_bits
                .load(Ordering::Acquire),
        )
    }

    pub fn global_sequence(&self) -> u32 {
        self.segment
            .header()
            .global_sequence
            .load(Ordering::Acquire)
    }

    pub fn total_updates(&self) -> u64 {
        self.segment.header().total_updates.load(Ordering::Acquire)
    }

    pub fn total_context_updates(&self) -> u64 {
        self.segment
            .header()
            .total_context_updates
            .load(Ordering::Acquire)
    }
}

// ===========================================================================
// TESTS
// ===========================================================================
