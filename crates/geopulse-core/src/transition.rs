use crate::grid;

/// Tracks the current spatial cell and fires when it changes.
///
/// The initial cell id is zero, which no valid cell can carry, so the very
/// first observation after startup always registers as a transition and
/// forces an initial context fetch.
#[derive(Debug, Clone, Copy)]
pub struct CellTracker {
    level: u32,
    previous: u64,
}

impl CellTracker {
    pub fn new(level: u32) -> Self {
        Self { level, previous: 0 }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Most recently observed cell id (0 until the first observation).
    pub fn current(&self) -> u64 {
        self.previous
    }

    /// Observe a smoothed position; `Some(cell)` iff the cell changed.
    pub fn observe(&mut self, lat: f64, lon: f64) -> Option<u64> {
        let cell = grid::cell_of(lat, lon, self.level);
        if cell != self.previous {
            self.previous = cell;
            Some(cell)
        } else {
            None
        }
    }

    /// On-demand boundary check between two points at this tracker's level.
    pub fn crossed_boundary(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> bool {
        grid::crossed_boundary(lat1, lon1, lat2, lon2, self.level)
    }
}

impl Default for CellTracker {
    fn default() -> Self {
        Self::new(grid::DEFAULT_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_fires() {
        let mut tracker = CellTracker::default();
        assert_eq!(tracker.current(), 0);
        let fired = tracker.observe(37.7749, -122.4194);
        assert!(fired.is_some());
        assert_eq!(tracker.current(), fired.unwrap());
    }

    #[test]
    fn test_same_cell_does_not_fire() {
        let mut tracker = CellTracker::default();
        tracker.observe(37.7749, -122.4194);
        assert!(tracker.observe(37.7749, -122.4194).is_none());
        // A few metres of drift stays inside the ~611 m cell.
        assert!(tracker.observe(37.77492, -122.41938).is_none());
    }

    #[test]
    fn test_cell_change_fires_once_per_crossing() {
        let mut tracker = CellTracker::default();
        tracker.observe(37.7749, -122.4194);
        let fired = tracker.observe(37.8749, -122.3194);
        assert!(fired.is_some());
        assert!(tracker.observe(37.8749, -122.3194).is_none());
    }

    #[test]
    fn test_crossed_boundary_predicate() {
        let tracker = CellTracker::default();
        assert!(!tracker.crossed_boundary(37.7749, -122.4194, 37.7750, -122.4193));
        assert!(tracker.crossed_boundary(37.7749, -122.4194, 34.0522, -118.2437));
    }
}
