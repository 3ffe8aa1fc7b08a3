//! Fixed-size state and context frames.
//!
//! Both structs are copied byte-for-byte into shared memory, so they are
//! `#[repr(C)]`, padding-free, and contain no heap-owned fields. All string
//! fields are fixed-width NUL-terminated byte arrays.

use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

pub const ROAD_NAME_LEN: usize = 256;
pub const SURFACE_LEN: usize = 64;
pub const TRAFFIC_LEN: usize = 32;
pub const HAZARDS_LEN: usize = 512;

/// Authoritative smoothed location snapshot published to the ring.
#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy, Debug, PartialEq)]
pub struct WorldState {
    pub smoothed_lat: f64,
    pub smoothed_lon: f64,
    pub smoothed_altitude: f64,
    /// Spatial cell id at `cell_level` (0 = not yet resolved)
    pub cell_id: u64,
    pub cell_level: u32,
    /// Non-zero iff the smoothed velocity magnitude exceeds the calibration
    /// threshold. Stored as a word to keep the struct padding-free.
    pub is_moving: u32,
    pub last_update_ms: i64,
    /// Strictly monotonic per producer process
    pub update_sequence: u32,
    pub step_count: u32,
    pub estimated_distance_m: f64,
}

const _: () = assert!(std::mem::size_of::<WorldState>() == 64);

impl WorldState {
    pub fn moving(&self) -> bool {
        self.is_moving != 0
    }

    pub fn set_moving(&mut self, moving: bool) {
        self.is_moving = moving as u32;
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

/// Environmental context payload published alongside a [`WorldState`].
#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy, Debug, PartialEq)]
pub struct ContextFrame {
    pub road_name: [u8; ROAD_NAME_LEN],
    /// Surface type tag ("asphalt", "gravel", ...)
    pub surface: [u8; SURFACE_LEN],
    /// Traffic level tag ("light", "moderate", "heavy")
    pub traffic: [u8; TRAFFIC_LEN],
    /// m/s
    pub current_speed: f64,
    /// km/h
    pub speed_limit: f64,
    pub elevation_gain_m: f64,
    pub gradient_percent: f64,
    /// Semi-structured text blob of nearby hazards
    pub hazards: [u8; HAZARDS_LEN],
    pub timestamp_ms: i64,
}

const _: () = assert!(std::mem::size_of::<ContextFrame>() == 904);

impl ContextFrame {
    pub fn set_road_name(&mut self, value: &str) {
        write_fixed(&mut self.road_name, value);
    }

    pub fn set_surface(&mut self, value: &str) {
        write_fixed(&mut self.surface, value);
    }

    pub fn set_traffic(&mut self, value: &str) {
        write_fixed(&mut self.traffic, value);
    }

    pub fn set_hazards(&mut self, value: &str) {
        write_fixed(&mut self.hazards, value);
    }

    pub fn road_name(&self) -> String {
        read_fixed(&self.road_name)
    }

    pub fn surface(&self) -> String {
        read_fixed(&self.surface)
    }

    pub fn traffic(&self) -> String {
        read_fixed(&self.traffic)
    }

    pub fn hazards(&self) -> String {
        read_fixed(&self.hazards)
    }

    /// True for the all-zero frame the daemon publishes between cell
    /// transitions.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }
}

impl Default for ContextFrame {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

/// Copy `src` into a fixed-width field, NUL-terminated when it fits.
///
/// Content longer than the field is truncated; the truncation is recorded by
/// leaving the field unterminated at the final byte.
pub fn write_fixed(dst: &mut [u8], src: &str) {
    dst.fill(0);
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
}

/// Read a fixed-width field up to its NUL terminator (or full width).
pub fn read_fixed(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_state_is_pod_sized() {
        assert_eq!(std::mem::size_of::<WorldState>(), 64);
        assert_eq!(std::mem::align_of::<WorldState>(), 8);
    }

    #[test]
    fn test_context_frame_is_pod_sized() {
        assert_eq!(std::mem::size_of::<ContextFrame>(), 904);
        assert_eq!(std::mem::align_of::<ContextFrame>(), 8);
    }

    #[test]
    fn test_default_frames_are_zeroed() {
        let state = WorldState::default();
        assert!(state.as_bytes().iter().all(|&b| b == 0));
        let frame = ContextFrame::default();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_string_fields_round_trip() {
        let mut frame = ContextFrame::default();
        frame.set_road_name("Main St");
        frame.set_surface("asphalt");
        frame.set_traffic("light");
        assert_eq!(frame.road_name(), "Main St");
        assert_eq!(frame.surface(), "asphalt");
        assert_eq!(frame.traffic(), "light");
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_overlong_string_truncated_unterminated() {
        let mut frame = ContextFrame::default();
        let long = "x".repeat(TRAFFIC_LEN + 10);
        frame.set_traffic(&long);
        // Field is full; the final byte is data, not a terminator.
        assert_eq!(frame.traffic[TRAFFIC_LEN - 1], b'x');
        assert_eq!(frame.traffic().len(), TRAFFIC_LEN);
    }

    #[test]
    fn test_overwrite_clears_previous_value() {
        let mut frame = ContextFrame::default();
        frame.set_surface("gravel");
        frame.set_surface("mud");
        assert_eq!(frame.surface(), "mud");
    }

    #[test]
    fn test_moving_flag() {
        let mut state = WorldState::default();
        assert!(!state.moving());
        state.set_moving(true);
        assert!(state.moving());
        assert_eq!(state.is_moving, 1);
    }
}
