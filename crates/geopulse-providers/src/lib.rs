//! # Geopulse Providers
//!
//! Pluggable environmental context providers. The daemon loop talks to one
//! active provider through the [`ContextProvider`] trait; the registry maps
//! plugin names to lazily-instantiated providers, and the command
//! dispatcher maps free-text keywords to activations.

pub mod cache;
pub mod cycling;
pub mod dating;
pub mod delivery;
pub mod dispatch;
pub mod registry;

pub use cache::SingleSlotCache;
pub use cycling::CyclingProvider;
pub use dating::DatingProvider;
pub use delivery::DeliveryProvider;
pub use dispatch::{dispatch_command, DispatchOutcome};
pub use registry::{ProviderFactory, ProviderRegistry};

use geopulse_core::ContextFrame;

/// Capability set every context provider implements.
///
/// Providers are driven from the daemon thread only; `getContext` may block
/// on upstream I/O, but the per-provider cache keeps its average latency
/// inside the tick budget.
pub trait ContextProvider: Send {
    /// Consume a semi-structured configuration blob (API credentials,
    /// endpoint overrides). Idempotent; unknown or missing keys fall back
    /// to defaults rather than failing.
    fn initialize(&mut self, config: &serde_json::Value);

    /// Fully populated context for a location. Never fails: upstream
    /// trouble degrades to cached or zeroed data.
    fn context_at(&mut self, lat: f64, lon: f64) -> ContextFrame;

    /// Fire-and-forget warm-up of points ahead along the heading vector.
    fn prefetch(&mut self, lat: f64, lon: f64, heading_deg: f64, distance_m: f64);

    fn name(&self) -> &'static str;
}

/// Register the built-in providers.
pub fn register_defaults(registry: &mut ProviderRegistry) {
    registry.register("cycling", || Box::new(CyclingProvider::new()));
    registry.register("dating", || Box::new(DatingProvider::new()));
    registry.register("delivery", || Box::new(DeliveryProvider::new()));
}
