use crate::cache::SingleSlotCache;
use crate::ContextProvider;
use geopulse_core::{grid, now_ms, ContextFrame};

const PREFETCH_POINTS: u32 = 3;

/// Road-cycling context: surface, traffic, grade and hazards around the
/// rider.
///
/// Upstream HTTP (elevation, routes, Overpass) is a collaborator outside
/// this crate; the fetch stages here synthesize deterministic per-cell data
/// in the same shape, so every consumer downstream sees realistic frames.
pub struct CyclingProvider {
    cache: SingleSlotCache,
    google_maps_api_key: Option<String>,
    osm_api_endpoint: Option<String>,
    upstream_fetches: u64,
}

impl CyclingProvider {
    pub fn new() -> Self {
        Self {
            cache: SingleSlotCache::new(),
            google_maps_api_key: None,
            osm_api_endpoint: None,
            upstream_fetches: 0,
        }
    }

    /// Number of upstream fetch rounds performed (cache misses).
    pub fn upstream_fetches(&self) -> u64 {
        self.upstream_fetches
    }

    fn fetch(&mut self, lat: f64, lon: f64, now: i64) -> ContextFrame {
        self.upstream_fetches += 1;

        let mut frame = ContextFrame::default();
        self.fetch_elevation(lat, lon, &mut frame);
        self.fetch_traffic(lat, lon, &mut frame);
        self.fetch_surface(lat, lon, &mut frame);
        frame.timestamp_ms = now;
        frame
    }

    fn fetch_elevation(&self, lat: f64, lon: f64, frame: &mut ContextFrame) {
        let seed = terrain_seed(lat, lon);
        frame.elevation_gain_m = (seed % 90) as f64;
        frame.gradient_percent = ((seed >> 8) % 120) as f64 / 10.0 - 2.0;
        frame.current_speed = 5.0;
        frame.speed_limit = 50.0;

        const FIRST: [&str; 5] = ["Main", "Ridge", "Bay", "Cedar", "Foothill"];
        const KIND: [&str; 3] = ["Street", "Road", "Avenue"];
        let name = format!(
            "{} {}",
            FIRST[(seed >> 16) as usize % FIRST.len()],
            KIND[(seed >> 24) as usize % KIND.len()]
        );
        frame.set_road_name(&name);
    }

    fn fetch_traffic(&self, lat: f64, lon: f64, frame: &mut ContextFrame) {
        let seed = terrain_seed(lat, lon);
        const LEVELS: [&str; 3] = ["light", "moderate", "heavy"];
        let level = LEVELS[(seed >> 32) as usize % LEVELS.len()];
        frame.set_traffic(level);

        let hazards = if level == "heavy" {
            serde_json::json!([
                { "type": "congestion", "severity": "high" },
                { "type": "narrow_shoulder" },
            ])
        } else {
            serde_json::json!([{ "type": "congestion", "severity": "low" }])
        };
        frame.set_hazards(&hazards.to_string());
    }

    fn fetch_surface(&self, lat: f64, lon: f64, frame: &mut ContextFrame) {
        let seed = terrain_seed(lat, lon);
        const SURFACES: [&str; 4] = ["asphalt", "concrete", "gravel", "dirt"];
        let surface = SURFACES[(seed >> 40) as usize % SURFACES.len()];

        // The Overpass round trip is stubbed; routing the value through an
        // OSM-shaped document keeps the response parser honest.
        let doc = serde_json::json!({
            "elements": [ { "type": "way", "tags": { "surface": surface } } ]
        });
        frame.set_surface(&parse_surface_tag(&doc.to_string()));
    }
}

impl Default for CyclingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextProvider for CyclingProvider {
    fn initialize(&mut self, config: &serde_json::Value) {
        if let Some(key) = config.get("google_maps_api_key").and_then(|v| v.as_str()) {
            self.google_maps_api_key = Some(key.to_owned());
        }
        if let Some(endpoint) = config.get("osm_api_endpoint").and_then(|v| v.as_str()) {
            self.osm_api_endpoint = Some(endpoint.to_owned());
        }
        tracing::info!(
            has_maps_key = self.google_maps_api_key.is_some(),
            osm_endpoint = self.osm_api_endpoint.as_deref().unwrap_or("default"),
            "cycling provider initialized"
        );
    }

    fn context_at(&mut self, lat: f64, lon: f64) -> ContextFrame {
        if !lat.is_finite() || !lon.is_finite() {
            // Soft failure: serve the last good frame rather than raise.
            tracing::warn!("context query with non-finite coordinates");
            return self.cache.last_frame().unwrap_or_default();
        }

        let now = now_ms();
        if let Some(hit) = self.cache.lookup(lat, lon, now) {
            return hit;
        }

        let frame = self.fetch(lat, lon, now);
        self.cache.store(frame, lat, lon, now);
        frame
    }

    fn prefetch(&mut self, lat: f64, lon: f64, heading_deg: f64, distance_m: f64) {
        let cos_lat = lat.to_radians().cos();
        if cos_lat.abs() < 1e-6 {
            return;
        }

        let heading = heading_deg.to_radians();
        let step_deg = (distance_m / 111_000.0) / f64::from(PREFETCH_POINTS);
        let now = now_ms();

        for i in 1..=PREFETCH_POINTS {
            let d = step_deg * f64::from(i);
            let ahead_lat = lat + d * heading.cos();
            // A longitude degree shrinks with latitude.
            let ahead_lon = lon + d * heading.sin() / cos_lat;

            let _ = self.fetch(ahead_lat, ahead_lon, now);
            tracing::debug!(lat = ahead_lat, lon = ahead_lon, "prefetched cycling context");
        }
    }

    fn name(&self) -> &'static str {
        "cycling"
    }
}

/// Extract the first `surface` tag from an Overpass-style JSON document;
/// "unknown" when the document carries none or does not parse.
pub fn parse_surface_tag(osm_response: &str) -> String {
    let Ok(doc) = serde_json::from_str::<serde_json::Value>(osm_response) else {
        return "unknown".to_owned();
    };
    doc.get("elements")
        .and_then(|e| e.as_array())
        .and_then(|elements| {
            elements
                .iter()
                .find_map(|el| el.get("tags")?.get("surface")?.as_str())
        })
        .unwrap_or("unknown")
        .to_owned()
}

/// Deterministic per-cell seed standing in for upstream terrain data.
fn terrain_seed(lat: f64, lon: f64) -> u64 {
    let cell = grid::cell_of(lat, lon, grid::DEFAULT_LEVEL);
    let mut z = cell.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ===========================================================================
// TESTS
// ===========================================================================
