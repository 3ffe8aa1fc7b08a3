//! Hierarchical spatial cell grid.
//!
//! A level-`L` grid divides the sphere into `2^L` columns of longitude and
//! `2^(L-1)` rows of latitude, giving equal-degree square cells (~611 m on a
//! side at level 16). Cell ids pack the level and the row/column together
//! with a marker bit, so a valid cell id is never zero; zero therefore works
//! as a "never observed" sentinel for transition tracking.

/// Mean Earth radius (m), as used by the haversine distance.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Finest supported grid level.
pub const MAX_LEVEL: u32 = 28;

/// Default level used by the transition detector (~611 m cells).
pub const DEFAULT_LEVEL: u32 = 16;

const CELL_MARKER: u64 = 1 << 63;
const LEVEL_SHIFT: u32 = 56;
const ROW_SHIFT: u32 = 28;
const INDEX_MASK: u64 = (1 << 28) - 1;

fn grid_dims(level: u32) -> (u64, u64) {
    let cols = 1u64 << level;
    let rows = if level == 0 { 1 } else { 1u64 << (level - 1) };
    (cols, rows)
}

/// Resolve the cell containing `(lat, lon)` at the given level.
///
/// Repeated calls with the same arguments always return the same id.
pub fn cell_of(lat: f64, lon: f64, level: u32) -> u64 {
    let level = level.min(MAX_LEVEL);
    let (cols, rows) = grid_dims(level);

    let lat = lat.clamp(-90.0, 90.0);
    // Normalize longitude into [0, 360) so the dateline maps cleanly.
    let lon = (lon + 180.0).rem_euclid(360.0);

    let col = (((lon / 360.0) * cols as f64) as u64).min(cols - 1);
    let row = ((((lat + 90.0) / 180.0) * rows as f64) as u64).min(rows - 1);

    CELL_MARKER | (u64::from(level) << LEVEL_SHIFT) | (row << ROW_SHIFT) | col
}

/// Level encoded in a cell id.
pub fn level_of(cell: u64) -> u32 {
    ((cell >> LEVEL_SHIFT) & 0x3F) as u32
}

fn decode(cell: u64) -> (u32, u64, u64) {
    let level = level_of(cell);
    let row = (cell >> ROW_SHIFT) & INDEX_MASK;
    let col = cell & INDEX_MASK;
    (level, row, col)
}

/// Center of a cell as `(lat, lon)` degrees.
pub fn center(cell: u64) -> (f64, f64) {
    let (level, row, col) = decode(cell);
    let (cols, rows) = grid_dims(level);

    let lat = -90.0 + (row as f64 + 0.5) * 180.0 / rows as f64;
    let lon = -180.0 + (col as f64 + 0.5) * 360.0 / cols as f64;
    (lat, lon)
}

/// Up to 4 edge neighbors. Longitude wraps around the dateline; rows at the
/// poles have no neighbor beyond them.
pub fn neighbors(cell: u64) -> Vec<u64> {
    let (level, row, col) = decode(cell);
    let (cols, rows) = grid_dims(level);
    let pack = |r: u64, c: u64| {
        CELL_MARKER | (u64::from(level) << LEVEL_SHIFT) | (r << ROW_SHIFT) | c
    };

    let mut out = Vec::with_capacity(4);
    out.push(pack(row, (col + 1) % cols));
    out.push(pack(row, (col + cols - 1) % cols));
    if row + 1 < rows {
        out.push(pack(row + 1, col));
    }
    if row > 0 {
        out.push(pack(row - 1, col));
    }
    // Degenerate at level 0 where east and west wrap onto the cell itself.
    out.retain(|&n| n != cell);
    out.dedup();
    out
}

/// Approximate cell area in square metres.
pub fn area_m2(cell: u64) -> f64 {
    let (level, _, _) = decode(cell);
    let (cols, rows) = grid_dims(level);
    let (center_lat, _) = center(cell);

    let lat_extent = (180.0_f64 / rows as f64).to_radians() * EARTH_RADIUS_M;
    let lon_extent =
        (360.0_f64 / cols as f64).to_radians() * EARTH_RADIUS_M * center_lat.to_radians().cos();
    lat_extent * lon_extent.abs()
}

/// Whether two points fall in different cells at the given level.
pub fn crossed_boundary(lat1: f64, lon1: f64, lat2: f64, lon2: f64, level: u32) -> bool {
    cell_of(lat1, lon1, level) != cell_of(lat2, lon2, level)
}

/// Great-circle distance between two points (degrees in, metres out).
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

// ===========================================================================
// TESTS
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SF: (f64, f64) = (37.7749, -122.4194);
    const LA: (f64, f64) = (34.0522, -118.2437);

    #[test]
    fn test_cell_id_never_zero() {
        assert_ne!(cell_of(SF.0, SF.1, 16), 0);
        assert_ne!(cell_of(0.0, 0.0, 0), 0);
        assert_ne!(cell_of(-90.0, -180.0, MAX_LEVEL), 0);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let a = cell_of(SF.0, SF.1, 16);
        let b = cell_of(SF.0, SF.1, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn test_nearby_points_share_a_cell() {
        // ~15 m apart, far from any ~611 m cell edge at these coordinates.
        let a = cell_of(37.77490, -122.41940, 16);
        let b = cell_of(37.77500, -122.41930, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distant_points_differ() {
        assert_ne!(cell_of(SF.0, SF.1, 16), cell_of(LA.0, LA.1, 16));
        assert!(crossed_boundary(SF.0, SF.1, LA.0, LA.1, 16));
    }

    #[test]
    fn test_levels_nest_coarser() {
        // Two points in distinct level-16 cells can share a coarse cell.
        let a = cell_of(37.7749, -122.4194, 4);
        let b = cell_of(37.8749, -122.3194, 4);
        assert_eq!(a, b);
        assert_ne!(level_of(a), 16);
        assert_eq!(level_of(cell_of(SF.0, SF.1, 16)), 16);
    }

    #[test]
    fn test_center_round_trips() {
        let cell = cell_of(SF.0, SF.1, 16);
        let (lat, lon) = center(cell);
        // Center lies inside the cell, so resolving it returns the cell.
        assert_eq!(cell_of(lat, lon, 16), cell);
        assert_relative_eq!(lat, SF.0, epsilon = 0.01);
        assert_relative_eq!(lon, SF.1, epsilon = 0.01);
    }

    #[test]
    fn test_neighbors_are_distinct_cells() {
        let cell = cell_of(SF.0, SF.1, 16);
        let ns = neighbors(cell);
        assert_eq!(ns.len(), 4);
        for n in &ns {
            assert_ne!(*n, cell);
            assert_eq!(level_of(*n), 16);
        }
    }

    #[test]
    fn test_neighbors_clamp_at_pole() {
        let cell = cell_of(89.999, 0.0, 16);
        let ns = neighbors(cell);
        // Top row: east, west and south only.
        assert_eq!(ns.len(), 3);
    }

    #[test]
    fn test_longitude_wraps_at_dateline() {
        let east = cell_of(0.0, 179.999, 16);
        let west = cell_of(0.0, -179.999, 16);
        assert!(neighbors(east).contains(&west) || east == west);
    }

    #[test]
    fn test_level16_cell_size() {
        let cell = cell_of(0.0, 0.0, 16);
        let area = area_m2(cell);
        // Equal-degree ~611 m cells at the equator.
        let edge = area.sqrt();
        assert!(edge > 500.0 && edge < 700.0, "edge = {edge}");
    }

    #[test]
    fn test_haversine_sf_to_la() {
        let d = haversine_m(SF.0, SF.1, LA.0, LA.1);
        assert!(d > 500_000.0, "d = {d}");
        assert!(d < 620_000.0, "d = {d}");
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert_relative_eq!(haversine_m(SF.0, SF.1, SF.0, SF.1), 0.0);
    }
}
