use geopulse_core::ContextFrame;

/// Cache TTL; one upstream fetch per window for a stationary user.
pub const CACHE_TTL_MS: i64 = 5_000;

/// Positional tolerance for a cache hit, in degrees (~100 m).
pub const CACHE_RADIUS_DEG: f64 = 0.001;

/// Single-slot cache of the most recent context frame.
///
/// A query hits when it is within [`CACHE_RADIUS_DEG`] of the cached point
/// *and* within [`CACHE_TTL_MS`] of the cached timestamp. This bounds
/// upstream API pressure to at most one request per window while
/// stationary, and roughly one per cell while moving.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleSlotCache {
    frame: ContextFrame,
    lat: f64,
    lon: f64,
    stored_at_ms: i64,
    valid: bool,
}

impl SingleSlotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, lat: f64, lon: f64, now_ms: i64) -> Option<ContextFrame> {
        if !self.valid {
            return None;
        }
        let fresh = now_ms - self.stored_at_ms < CACHE_TTL_MS;
        let near = (lat - self.lat).abs() < CACHE_RADIUS_DEG
            && (lon - self.lon).abs() < CACHE_RADIUS_DEG;
        (fresh && near).then_some(self.frame)
    }

    pub fn store(&mut self, frame: ContextFrame, lat: f64, lon: f64, now_ms: i64) {
        self.frame = frame;
        self.lat = lat;
        self.lon = lon;
        self.stored_at_ms = now_ms;
        self.valid = true;
    }

    /// Most recent frame regardless of freshness. When an upstream fetch
    /// goes wrong the provider falls back to this rather than raising.
    pub fn last_frame(&self) -> Option<ContextFrame> {
        self.valid.then_some(self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> ContextFrame {
        let mut f = ContextFrame::default();
        f.set_surface("asphalt");
        f
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache = SingleSlotCache::new();
        assert!(cache.lookup(37.0, -122.0, 1000).is_none());
    }

    #[test]
    fn test_hit_within_radius_and_ttl() {
        let mut cache = SingleSlotCache::new();
        cache.store(frame(), 37.0, -122.0, 1000);

        assert!(cache.lookup(37.0, -122.0, 1000).is_some());
        assert!(cache.lookup(37.0005, -122.0005, 5999).is_some());
    }

    #[test]
    fn test_miss_beyond_radius() {
        let mut cache = SingleSlotCache::new();
        cache.store(frame(), 37.0, -122.0, 1000);

        assert!(cache.lookup(37.002, -122.0, 1001).is_none());
        assert!(cache.lookup(37.0, -122.002, 1001).is_none());
    }

    #[test]
    fn test_miss_after_ttl() {
        let mut cache = SingleSlotCache::new();
        cache.store(frame(), 37.0, -122.0, 1000);

        assert!(cache.lookup(37.0, -122.0, 5999).is_some());
        assert!(cache.lookup(37.0, -122.0, 6000).is_none());
    }

    #[test]
    fn test_store_overwrites() {
        let mut cache = SingleSlotCache::new();
        cache.store(frame(), 37.0, -122.0, 1000);

        let mut newer = ContextFrame::default();
        newer.set_surface("gravel");
        cache.store(newer, 38.0, -121.0, 2000);

        assert!(cache.lookup(37.0, -122.0, 2001).is_none());
        let hit = cache.lookup(38.0, -121.0, 2001).unwrap();
        assert_eq!(hit.surface(), "gravel");
    }

    #[test]
    fn test_last_frame_survives_expiry() {
        let mut cache = SingleSlotCache::new();
        cache.store(frame(), 37.0, -122.0, 1000);
        assert!(cache.lookup(37.0, -122.0, 100_000).is_none());
        assert!(cache.last_frame().is_some());
    }
}
