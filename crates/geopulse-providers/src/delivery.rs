use crate::cache::SingleSlotCache;
use crate::ContextProvider;
use geopulse_core::{grid, now_ms, ContextFrame};

/// Courier context: traffic, zone restrictions and drop-off hazards.
pub struct DeliveryProvider {
    cache: SingleSlotCache,
}

impl DeliveryProvider {
    pub fn new() -> Self {
        Self {
            cache: SingleSlotCache::new(),
        }
    }

    fn fetch(&self, lat: f64, lon: f64, now: i64) -> ContextFrame {
        let cell = grid::cell_of(lat, lon, grid::DEFAULT_LEVEL);

        let mut frame = ContextFrame::default();
        frame.set_road_name(&format!("Zone {}", cell % 100));
        frame.set_surface("asphalt");
        const LEVELS: [&str; 3] = ["light", "moderate", "heavy"];
        frame.set_traffic(LEVELS[(cell % LEVELS.len() as u64) as usize]);
        frame.current_speed = 8.0;
        frame.speed_limit = 30.0;

        let hazards = serde_json::json!([
            { "type": "loading_zone", "restricted": cell % 2 == 0 },
        ]);
        frame.set_hazards(&hazards.to_string());
        frame.timestamp_ms = now;
        frame
    }
}

impl Default for DeliveryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextProvider for DeliveryProvider {
    fn initialize(&mut self, _config: &serde_json::Value) {
        tracing::info!("delivery provider initialized");
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
        tracing::debug!(lat, lon, "prefetching delivery zones");
    }

    fn name(&self) -> &'static str {
        "delivery"
    }
}
