use crate::session::SessionSink;
use anyhow::{bail, Context, Result};
use geopulse_core::{ContextFrame, WorldState};
use geopulse_ipc::{StateReader, SEGMENT_NAME};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct AdapterConfig {
    pub segment_name: String,
    /// Snapshot cadence.
    pub poll_ms: u64,
    /// How long to wait for the producer before giving up.
    pub grace_ms: u64,
    /// Stop after this many polls (None = run until the flag clears).
    pub max_polls: Option<u64>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            segment_name: SEGMENT_NAME.to_owned(),
            poll_ms: 500,
            grace_ms: 3_000,
            max_polls: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AdapterStats {
    pub polls: u64,
    pub forwards: u64,
}

/// Running polynomial hash over the context fields whose changes warrant a
/// re-forward: the surface string and the gradient quantised to a tenth of
/// a percentage point. Sub-0.1pp gradient jitter therefore never causes
/// chatter, and the hash of an empty frame is zero.
pub fn context_hash(frame: &ContextFrame) -> u64 {
    let mut hash: u64 = 0;
    for &b in frame.surface.iter().take_while(|&&b| b != 0) {
        hash = hash.wrapping_mul(31).wrapping_add(u64::from(b));
    }
    let gradient = (frame.gradient_percent * 10.0).round() as i64;
    hash.wrapping_mul(31).wrapping_add(gradient as u64)
}

/// Human-readable system instruction embedding the state the session
/// should know about.
pub fn format_instruction(state: &WorldState, frame: &ContextFrame) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "You are an expert cycling guide. User is at {:.6}, {:.6}, elevation {:.1} m. ",
        state.smoothed_lat, state.smoothed_lon, state.smoothed_altitude
    );
    let _ = write!(
        out,
        "Gradient: {:.1}%. Traffic: {}. Surface: {}. Road: {}. ",
        frame.gradient_percent,
        frame.traffic(),
        frame.surface(),
        frame.road_name()
    );
    if state.moving() {
        let _ = write!(
            out,
            "User is moving: {} steps, {:.1} m travelled.",
            state.step_count, state.estimated_distance_m
        );
    } else {
        out.push_str("User is stationary.");
    }
    out
}

/// Run the adapter loop: snapshot the latest published state, forward the
/// context to the session when its hash changes.
pub fn run_adapter(
    config: &AdapterConfig,
    sink: &mut dyn SessionSink,
    running: Arc<AtomicBool>,
) -> Result<AdapterStats> {
    let grace = Duration::from_millis(config.grace_ms);

    let reader = StateReader::open_named(&config.segment_name)
        .context("opening the shared memory segment (is the location daemon running?)")?;
    if !reader.wait_alive(grace) {
        bail!("location service is not running");
    }
    tracing::info!(
        plugin = %reader.active_plugin(),
        accuracy = reader.accuracy_level(),
        "connected to location service"
    );

    let mut stats = AdapterStats::default();
    let mut last_hash: u64 = 0;
    let mut dead_since: Option<Instant> = None;

    while running.load(Ordering::Relaxed) {
        if reader.producer_alive() {
            dead_since = None;
        } else {
            // Tolerate a brief flap; a producer gone past the grace window
            // ends the loop.
            let since = *dead_since.get_or_insert_with(Instant::now);
            if since.elapsed() >= grace {
                tracing::warn!("location service went away");
                break;
            }
        }

        if let Some((state, frame)) = reader.snapshot() {
            let hash = context_hash(&frame);
            if hash != last_hash {
                last_hash = hash;
                let instruction = format_instruction(&state, &frame);
                sink.send_context(&instruction);
                stats.forwards += 1;
            }
        }

        stats.polls += 1;
        if let Some(max) = config.max_polls {
            if stats.polls >= max {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(config.poll_ms));
    }

    tracing::info!(
        polls = stats.polls,
        forwards = stats.forwards,
        "adapter stopped"
    );
    Ok(stats)
}

// ===========================================================================
// TESTS
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(surface: &str, gradient: f64) -> ContextFrame {
        let mut f = ContextFrame::default();
        f.set_surface(surface);
        f.gradient_percent = gradient;
        f
    }

    #[test]
    fn test_empty_frame_hashes_to_zero() {
        assert_eq!(context_hash(&ContextFrame::default()), 0);
    }

    #[test]
    fn test_surface_change_changes_hash() {
        assert_ne!(
            context_hash(&frame("asphalt", 5.5)),
            context_hash(&frame("gravel", 5.5))
        );
    }

    #[test]
    fn test_gradient_quantisation_suppresses_jitter() {
        // Below a tenth of a percentage point: same hash.
        assert_eq!(
            context_hash(&frame("asphalt", 5.50)),
            context_hash(&frame("asphalt", 5.54))
        );
        // At or above: different hash.
        assert_ne!(
            context_hash(&frame("asphalt", 5.5)),
            context_hash(&frame("asphalt", 5.6))
        );
    }

    #[test]
    fn test_road_name_alone_does_not_retrigger() {
        // Deliberately narrow hash: road, traffic and elevation gain are
        // not part of the change signal.
        let mut a = frame("asphalt", 5.5);
        a.set_road_name("Main St");
        let mut b = frame("asphalt", 5.5);
        b.set_road_name("Side St");
        assert_eq!(context_hash(&a), context_hash(&b));
    }

    #[test]
    fn test_instruction_embeds_key_fields() {
        let mut state = WorldState::default();
        state.smoothed_lat = 37.7749;
        state.smoothed_lon = -122.4194;
        state.smoothed_altitude = 52.0;
        state.set_moving(true);
        state.step_count = 42;
        state.estimated_distance_m = 29.4;

        let mut f = frame("asphalt", 5.5);
        f.set_traffic("moderate");
        f.set_road_name("Main St");

        let text = format_instruction(&state, &f);
        assert!(text.contains("37.774900"));
        assert!(text.contains("-122.419400"));
        assert!(text.contains("52.0 m"));
        assert!(text.contains("5.5%"));
        assert!(text.contains("moderate"));
        assert!(text.contains("asphalt"));
        assert!(text.contains("42 steps"));
    }

    #[test]
    fn test_instruction_for_stationary_user() {
        let state = WorldState::default();
        let text = format_instruction(&state, &ContextFrame::default());
        assert!(text.contains("stationary"));
    }
}
