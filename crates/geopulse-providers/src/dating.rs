use crate::cache::SingleSlotCache;
use crate::ContextProvider;
use geopulse_core::{grid, now_ms, ContextFrame};

/// Venue-and-people context for the dating plugin.
///
/// The upstream service is an opaque endpoint; frames here carry the same
/// shape it would return, synthesized per cell.
pub struct DatingProvider {
    cache: SingleSlotCache,
    endpoint: Option<String>,
}

impl DatingProvider {
    pub fn new() -> Self {
        Self {
            cache: SingleSlotCache::new(),
            endpoint: None,
        }
    }

    fn fetch(&self, lat: f64, lon: f64, now: i64) -> ContextFrame {
        let cell = grid::cell_of(lat, lon, grid::DEFAULT_LEVEL);

        let mut frame = ContextFrame::default();
        const VENUES: [&str; 4] = ["Central Park", "Harbor Walk", "Old Town Square", "Lakefront"];
        frame.set_road_name(VENUES[(cell % VENUES.len() as u64) as usize]);
        frame.set_surface("venue");
        frame.set_traffic("busy");
        frame.current_speed = 1.2;

        let nearby = serde_json::json!([
            { "type": "user", "name": "Sarah", "distance": 50 },
            { "type": "venue", "name": "Coffee Shop", "distance": 200 },
        ]);
        frame.set_hazards(&nearby.to_string());
        frame.timestamp_ms = now;
        frame
    }
}

impl Default for DatingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextProvider for DatingProvider {
    fn initialize(&mut self, config: &serde_json::Value) {
        if let Some(endpoint) = config.get("endpoint").and_then(|v| v.as_str()) {
            self.endpoint = Some(endpoint.to_owned());
        }
        tracing::info!("dating provider initialized");
    }

    fn context_at(&mut self, lat: f64, lon: f64) -> ContextFrame {
        let now = now_ms();
        if let Some(hit) = self.cache.lookup(lat, lon, now) {
            return hit;
        }
        let frame = self.fetch(lat, lon, now);
        self.cache.store(frame, lat, lon, now);
        frame
    }

    fn prefetch(&mut self, lat: f64, lon: f64, _heading_deg: f64, _distance_m: f64) {
        tracing::debug!(lat, lon, "prefetching nearby venues");
    }

    fn name(&self) -> &'static str {
        "dating"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shape() {
        let mut provider = DatingProvider::new();
        let frame = provider.context_at(40.7829, -73.9654);
        assert_eq!(frame.surface(), "venue");
        assert!(frame.hazards().contains("Coffee Shop"));
    }

    #[test]
    fn test_cache_discipline_applies() {
        let mut provider = DatingProvider::new();
        let a = provider.context_at(40.7829, -73.9654);
        let b = provider.context_at(40.7829, -73.9654);
        assert_eq!(a.timestamp_ms, b.timestamp_ms);
    }
}
