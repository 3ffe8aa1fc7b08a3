use crate::layout::{PLUGIN_NAME_LEN, RING_SLOTS, SEGMENT_NAME};
use crate::segment::{IpcError, Segment};
use geopulse_core::{ContextFrame, WorldState};
use std::ptr;
use std::sync::atomic::{fence, Ordering};

/// Producer handle. Exactly one per segment, held by the location daemon;
/// the constructor owns the segment, so a second writer would replace it.
pub struct StateWriter {
    segment: Segment,
}

impl StateWriter {
    pub fn create() -> Result<Self, IpcError> {
        Self::create_named(SEGMENT_NAME)
    }

    pub fn create_named(name: &str) -> Result<Self, IpcError> {
        Ok(Self {
            segment: Segment::create(name)?,
        })
    }

    /// Publish one `(state, context)` pair. Wait-free.
    ///
    /// The slot sequence goes odd before the payload copy and even after;
    /// only then does `write_index` advance, so readers either see the
    /// previous stable slot or this one, never a mix.
    pub fn publish(&mut self, state: &WorldState, context: &ContextFrame) {
        let header = self.segment.header();
        let k = header.write_index.load(Ordering::Relaxed) as usize % RING_SLOTS;
        let entry = self.segment.slot(k);

        let seq = entry.seq.load(Ordering::Relaxed).wrapping_add(1);
        debug_assert!(seq & 1 == 1, "slot sequence must be odd during a write");
        entry.seq.store(seq, Ordering::Relaxed);
        fence(Ordering::Release);

        unsafe {
            ptr::write_volatile(entry.state.get(), *state);
            ptr::write_volatile(entry.context.get(), *context);
        }

        fence(Ordering::Release);
        entry.seq.store(seq.wrapping_add(1), Ordering::Release);

        header
            .write_index
            .store(((k + 1) % RING_SLOTS) as u32, Ordering::Release);
        header.global_sequence.fetch_add(1, Ordering::Release);
        header.total_updates.fetch_add(1, Ordering::Relaxed);
        if !context.is_empty() {
            header.total_context_updates.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Mirror the active plugin name into the header for consumers.
    pub fn set_active_plugin(&mut self, name: &str) {
        let header = self.segment.header();

        let seq = header.config_seq.load(Ordering::Relaxed).wrapping_add(1);
        header.config_seq.store(seq, Ordering::Relaxed);
        fence(Ordering::Release);

        let mut field = [0u8; PLUGIN_NAME_LEN];
        geopulse_core::state::write_fixed(&mut field[..PLUGIN_NAME_LEN - 1], name);
        unsafe {
            ptr::write_volatile(header.active_plugin.get(), field);
        }

        fence(Ordering::Release);
        header.config_seq.store(seq.wrapping_add(1), Ordering::Release);
    }

    /// Accuracy level, clamped to [0.0, 1.0].
    pub fn set_accuracy_level(&mut self, level: f64) {
        let clamped = if level.is_finite() {
            level.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.segment
            .header()
            .accuracy_bits
            .store(clamped.to_bits(), Ordering::Release);
    }

    pub fn mark_alive(&mut self) {
        self.segment
            .header()
            .producer_alive
            .store(1, Ordering::Release);
    }

    pub fn mark_dead(&mut self) {
        self.segment
            .header()
            .producer_alive
            .store(0, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn segment(&self) -> &Segment {
        &self.segment
    }
}
