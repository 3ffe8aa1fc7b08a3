use nalgebra::Vector3;

/// Raw positioning sample from the GPS/IMU collaborator.
///
/// One sample is produced per daemon iteration and consumed once by the
/// fusion filter; samples are never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    /// WGS84 latitude (degrees)
    pub latitude: f64,
    /// WGS84 longitude (degrees)
    pub longitude: f64,
    /// Altitude above mean sea level (m)
    pub altitude: f64,
    /// Horizontal accuracy, 1 sigma (m)
    pub accuracy: f64,
    /// Ground speed (m/s)
    pub speed: f64,
    /// Heading (degrees, 0-360)
    pub heading: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Body-frame acceleration (m/s^2)
    pub accel: Vector3<f64>,
    /// Body-frame angular rate (rad/s)
    pub gyro: Vector3<f64>,
}

impl LocationSample {
    /// A bare fix at the given position and time, with benign defaults for
    /// everything else (10 m accuracy, zero motion, zero IMU).
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
            accuracy: 10.0,
            speed: 0.0,
            heading: 0.0,
            timestamp_ms,
            accel: Vector3::zeros(),
            gyro: Vector3::zeros(),
        }
    }

    /// Whether the sample is usable by the filter.
    ///
    /// NaN/non-finite coordinates, out-of-range coordinates and absurd
    /// accuracy figures all disqualify a sample; the filter drops such
    /// samples and keeps its last valid estimate.
    pub fn is_plausible(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
            && self.altitude.is_finite()
            && self.accuracy.is_finite()
            && self.accuracy >= 0.0
            && self.accuracy < 10_000.0
            && self.accel.iter().all(|a| a.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let s = LocationSample::new(37.7749, -122.4194, 1000);
        assert_eq!(s.accuracy, 10.0);
        assert_eq!(s.speed, 0.0);
        assert!(s.is_plausible());
    }

    #[test]
    fn test_nan_rejected() {
        let mut s = LocationSample::new(37.7749, -122.4194, 1000);
        s.latitude = f64::NAN;
        assert!(!s.is_plausible());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut s = LocationSample::new(95.0, 0.0, 1000);
        assert!(!s.is_plausible());
        s = LocationSample::new(0.0, 200.0, 1000);
        assert!(!s.is_plausible());
    }

    #[test]
    fn test_absurd_accuracy_rejected() {
        let mut s = LocationSample::new(37.7749, -122.4194, 1000);
        s.accuracy = 1.0e6;
        assert!(!s.is_plausible());
        s.accuracy = -1.0;
        assert!(!s.is_plausible());
    }
}
