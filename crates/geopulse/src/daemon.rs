use crate::sensor::SensorSource;
use anyhow::{Context, Result};
use geopulse_core::{grid, ContextFrame, GeoKalman};
use geopulse_core::transition::CellTracker;
use geopulse_ipc::{StateWriter, SEGMENT_NAME};
use geopulse_providers::{dispatch_command, register_defaults, ProviderRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How far ahead (m) the active provider warms its caches while moving.
const PREFETCH_DISTANCE_M: f64 = 200.0;

pub struct DaemonConfig {
    pub segment_name: String,
    /// Target loop rate; each tick fuses one sample and publishes once.
    pub tick_hz: u32,
    pub cell_level: u32,
    /// Provider activated at startup.
    pub provider: String,
    /// Configuration blob handed to providers on activation.
    pub provider_config: serde_json::Value,
    /// Stop after this many ticks (None = run until the flag clears).
    pub max_ticks: Option<u64>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            segment_name: SEGMENT_NAME.to_owned(),
            tick_hz: 10,
            cell_level: grid::DEFAULT_LEVEL,
            provider: "cycling".to_owned(),
            provider_config: serde_json::json!({}),
            max_ticks: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DaemonStats {
    pub ticks: u64,
    /// Cell transitions that produced a fresh context frame.
    pub context_refreshes: u64,
}

/// Run the location daemon loop: sense, fuse, resolve the cell, refresh
/// context on transitions, publish.
///
/// Free-text commands arriving on `commands` are dispatched between ticks,
/// which keeps all registry mutation on this thread. The shared-memory
/// segment lives exactly as long as this function: its drop clears the
/// liveness flag and removes the backing file.
pub fn run_daemon(
    config: &DaemonConfig,
    sensor: &mut dyn SensorSource,
    commands: Receiver<String>,
    running: Arc<AtomicBool>,
) -> Result<DaemonStats> {
    let mut writer = StateWriter::create_named(&config.segment_name)
        .context("creating the shared memory segment")?;

    let mut registry = ProviderRegistry::new();
    register_defaults(&mut registry);

    if registry.activate(&config.provider) {
        if let Some(provider) = registry.provider_mut(&config.provider) {
            provider.initialize(&config.provider_config);
        }
        writer.set_active_plugin(&config.provider);
    } else {
        tracing::warn!(provider = %config.provider, "initial provider unavailable, running without context");
    }
    writer.set_accuracy_level(1.0);

    let tick = Duration::from_millis(1000 / u64::from(config.tick_hz.max(1)));
    let mut filter = GeoKalman::default();
    let mut tracker = CellTracker::new(config.cell_level);
    let mut update_sequence: u32 = 0;
    let mut stats = DaemonStats::default();

    tracing::info!(
        tick_hz = config.tick_hz,
        level = config.cell_level,
        "location daemon started"
    );

    while running.load(Ordering::Relaxed) {
        let tick_started = Instant::now();

        // Commands are serialised through this thread; dispatch outcomes
        // mirror into the header so consumers can observe them.
        while let Ok(command) = commands.try_recv() {
            if let Some(outcome) = dispatch_command(&command, &mut registry) {
                if let Some(provider) = registry.provider_mut(outcome.provider) {
                    provider.initialize(&config.provider_config);
                }
                writer.set_active_plugin(outcome.provider);
                if let Some(accuracy) = outcome.accuracy {
                    writer.set_accuracy_level(accuracy);
                }
            }
        }

        let sample = sensor.next_sample();
        filter.update(&sample);

        let mut state = filter.smoothed_state();
        state.cell_level = config.cell_level;

        let context = match tracker.observe(state.smoothed_lat, state.smoothed_lon) {
            Some(cell) => {
                state.cell_id = cell;
                tracing::debug!(cell, "cell transition");
                match registry.active_mut() {
                    Some(provider) => {
                        let frame =
                            provider.context_at(state.smoothed_lat, state.smoothed_lon);
                        if state.moving() {
                            provider.prefetch(
                                state.smoothed_lat,
                                state.smoothed_lon,
                                sample.heading,
                                PREFETCH_DISTANCE_M,
                            );
                        }
                        stats.context_refreshes += 1;
                        frame
                    }
                    // Transitions with no active provider publish empty.
                    None => ContextFrame::default(),
                }
            }
            None => {
                state.cell_id = tracker.current();
                ContextFrame::default()
            }
        };

        update_sequence = update_sequence.wrapping_add(1);
        state.update_sequence = update_sequence;
        writer.publish(&state, &context);

        stats.ticks += 1;
        if stats.ticks % 50 == 0 {
            tracing::debug!(
                lat = state.smoothed_lat,
                lon = state.smoothed_lon,
                steps = state.step_count,
                tick = stats.ticks,
                "daemon tick"
            );
        }
        if let Some(max) = config.max_ticks {
            if stats.ticks >= max {
                break;
            }
        }

        let elapsed = tick_started.elapsed();
        if elapsed < tick {
            std::thread::sleep(tick - elapsed);
        }
    }

    tracing::info!(
        ticks = stats.ticks,
        refreshes = stats.context_refreshes,
        "location daemon stopped"
    );
    Ok(stats)
}
