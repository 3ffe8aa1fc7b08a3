//! # Geopulse Core
//!
//! Core location-processing library for the geopulse pipeline:
//! - 2D constant-velocity Kalman filter with adaptive measurement noise
//! - Step detection (pedestrian dead reckoning side channel)
//! - Hierarchical spatial cell grid and transition tracking
//! - Fixed-size state/context frames suitable for byte-copy transport

pub mod fusion;
pub mod grid;
pub mod sample;
pub mod state;
pub mod transition;

// Re-export core types
pub use fusion::{FilterTuning, GeoKalman, StepDetector};
pub use sample::LocationSample;
pub use state::{ContextFrame, WorldState};
pub use transition::CellTracker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
