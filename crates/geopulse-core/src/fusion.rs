use crate::sample::LocationSample;
use crate::state::WorldState;
use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};

// ---------------------------------------------------------------------------
// TUNING
// ---------------------------------------------------------------------------

/// Filter tuning knobs, all adjustable at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterTuning {
    /// Process noise scale `q`; position diagonals get `q * 1e-3`.
    pub process_noise: f64,
    /// Floor for the adaptive measurement noise `r = max(floor, accuracy^2)`.
    pub measurement_noise_floor: f64,
    /// Per-component velocity magnitude (deg/s) above which we report motion.
    pub moving_velocity_thresh: f64,
    /// Vertical acceleration a sample must cross from below to count a step.
    pub step_threshold: f64,
    /// Minimum spacing between recorded steps.
    pub step_min_interval_ms: i64,
    /// Mean step length used for the distance estimate.
    pub step_length_m: f64,
}

impl Default for FilterTuning {
    fn default() -> Self {
        Self {
            process_noise: 0.1,
            measurement_noise_floor: 100.0,
            moving_velocity_thresh: 0.1,
            step_threshold: 15.0,
            step_min_interval_ms: 300,
            step_length_m: 0.7,
        }
    }
}

const INITIAL_COVARIANCE: f64 = 1.0e6;
const DT_MIN_S: f64 = 0.01;
const DT_MAX_S: f64 = 1.0;

// ---------------------------------------------------------------------------
// STEP DETECTOR (PDR side channel)
// ---------------------------------------------------------------------------

/// Threshold-and-interval peak detector on vertical acceleration.
///
/// A step is recorded when vertical acceleration crosses the threshold from
/// below, subject to a minimum inter-step interval. The detector never
/// touches the filter state vector or covariance.
#[derive(Debug, Clone, Copy)]
pub struct StepDetector {
    threshold: f64,
    min_interval_ms: i64,
    last_accel_z: f64,
    last_step_ms: i64,
}

impl StepDetector {
    pub fn new(threshold: f64, min_interval_ms: i64) -> Self {
        Self {
            threshold,
            min_interval_ms,
            last_accel_z: 0.0,
            last_step_ms: 0,
        }
    }

    /// Feed one vertical-acceleration reading; true iff a step was recorded.
    pub fn on_sample(&mut self, accel_z: f64, now_ms: i64) -> bool {
        let rising = self.last_accel_z < self.threshold && accel_z >= self.threshold;
        self.last_accel_z = accel_z;

        if rising && now_ms - self.last_step_ms >= self.min_interval_ms {
            self.last_step_ms = now_ms;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.last_accel_z = 0.0;
        self.last_step_ms = 0;
    }
}

// ---------------------------------------------------------------------------
// MAIN FILTER
// ---------------------------------------------------------------------------

/// Constant-velocity 2D Kalman filter over (lat, lon, vlat, vlon).
///
/// Measurement noise adapts per sample to the reported GPS accuracy; the
/// initial covariance is large enough that the first fix dominates the
/// prior, so no dedicated first-sample seeding is required.
pub struct GeoKalman {
    x: Vector4<f64>,
    p: Matrix4<f64>,
    q: Matrix4<f64>,
    r: Matrix2<f64>,
    h: Matrix2x4<f64>,
    tuning: FilterTuning,

    pdr_enabled: bool,
    steps: StepDetector,
    step_count: u32,

    last_update_ms: i64,
    /// Altitude is not part of the 2D model; the latest accepted sample's
    /// altitude passes through to the output.
    last_altitude: f64,
}

impl GeoKalman {
    pub fn new(tuning: FilterTuning) -> Self {
        let h = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0,
        );

        Self {
            x: Vector4::zeros(),
            p: Matrix4::identity() * INITIAL_COVARIANCE,
            q: process_noise_matrix(tuning.process_noise),
            r: Matrix2::identity() * tuning.measurement_noise_floor,
            h,
            tuning,
            pdr_enabled: true,
            steps: StepDetector::new(tuning.step_threshold, tuning.step_min_interval_ms),
            step_count: 0,
            last_update_ms: 0,
            last_altitude: 0.0,
        }
    }

    pub fn enable_pdr(&mut self, enabled: bool) {
        self.pdr_enabled = enabled;
    }

    /// Feed one positioning sample through predict + correct.
    ///
    /// Degenerate samples (NaN, out-of-range, absurd accuracy) are dropped
    /// without touching the state, so the last valid estimate survives a bad
    /// sensor burst.
    pub fn update(&mut self, sample: &LocationSample) {
        if !sample.is_plausible() {
            tracing::debug!(
                lat = sample.latitude,
                lon = sample.longitude,
                accuracy = sample.accuracy,
                "dropping degenerate sample"
            );
            return;
        }

        // A cold filter has no cadence information; the clamp ceiling lets
        // the wide prior absorb the first fix.
        let dt = if self.last_update_ms > 0 {
            ((sample.timestamp_ms - self.last_update_ms) as f64 / 1000.0).clamp(DT_MIN_S, DT_MAX_S)
        } else {
            DT_MAX_S
        };
        self.last_update_ms = sample.timestamp_ms;

        // Lower accuracy -> larger R -> the filter trusts GPS less.
        let r = sample
            .accuracy
            .powi(2)
            .max(self.tuning.measurement_noise_floor);
        self.r = Matrix2::identity() * r;

        self.predict(dt);
        self.correct(Vector2::new(sample.latitude, sample.longitude));

        self.last_altitude = sample.altitude;

        if self.pdr_enabled && self.steps.on_sample(sample.accel.z, sample.timestamp_ms) {
            self.step_count += 1;
        }
    }

    fn predict(&mut self, dt: f64) {
        let mut a = Matrix4::identity();
        a[(0, 2)] = dt;
        a[(1, 3)] = dt;

        self.x = a * self.x;
        self.p = a * self.p * a.transpose() + self.q;
    }

    fn correct(&mut self, z: Vector2<f64>) {
        let y = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;

        // S is R-dominated and always invertible in practice; skip the
        // correction rather than propagate a singular gain.
        let Some(s_inv) = s.try_inverse() else {
            tracing::warn!("innovation covariance not invertible, skipping correction");
            return;
        };
        let k = self.p * self.h.transpose() * s_inv;

        self.x += k * y;
        self.p = (Matrix4::identity() - k * self.h) * self.p;
    }

    /// Package the filtered position as a [`WorldState`].
    ///
    /// Cell id and update sequence belong to the daemon loop and are left
    /// zeroed here.
    pub fn smoothed_state(&self) -> WorldState {
        let mut state = WorldState::default();
        state.smoothed_lat = self.x[0];
        state.smoothed_lon = self.x[1];
        state.smoothed_altitude = self.last_altitude;
        state.set_moving(
            self.x[2].abs() > self.tuning.moving_velocity_thresh
                || self.x[3].abs() > self.tuning.moving_velocity_thresh,
        );
        state.step_count = self.step_count;
        state.estimated_distance_m = f64::from(self.step_count) * self.tuning.step_length_m;
        state.last_update_ms = self.last_update_ms;
        state
    }

    /// Restore initial values; used after long GPS outages.
    pub fn reset(&mut self) {
        self.x = Vector4::zeros();
        self.p = Matrix4::identity() * INITIAL_COVARIANCE;
        self.step_count = 0;
        self.last_update_ms = 0;
        self.last_altitude = 0.0;
        self.steps.reset();
    }

    pub fn set_process_noise(&mut self, q: f64) {
        self.tuning.process_noise = q;
        self.q = process_noise_matrix(q);
    }

    pub fn set_measurement_noise(&mut self, r: f64) {
        self.r = Matrix2::identity() * r;
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }
}

impl Default for GeoKalman {
    fn default() -> Self {
        Self::new(FilterTuning::default())
    }
}

/// Q = q * I with the two position diagonals scaled down: position is
/// trusted more than velocity as an evolution model.
fn process_noise_matrix(q: f64) -> Matrix4<f64> {
    let mut m = Matrix4::identity() * q;
    m[(0, 0)] *= 1.0e-3;
    m[(1, 1)] *= 1.0e-3;
    m
}

// ===========================================================================
// TESTS
// ===========================================================================
