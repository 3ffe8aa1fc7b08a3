//! Geopulse - geospatial context pipeline.
//!
//! Two cooperating processes built from this crate:
//! - `geopulse daemon`: fuses raw positioning samples, indexes the smoothed
//!   trajectory into spatial cells, refreshes environmental context on cell
//!   transitions and publishes everything over shared memory.
//! - `geopulse adapter`: snapshots the latest published state and forwards
//!   context changes to an external speech/AI session.

pub mod adapter;
pub mod daemon;
pub mod sensor;
pub mod session;

pub use adapter::{run_adapter, AdapterConfig, AdapterStats};
pub use daemon::{run_daemon, DaemonConfig, DaemonStats};
pub use sensor::{SensorConfig, SensorSource, SimulatedSensor};
pub use session::{LoggingSession, SessionSink};
