use crate::registry::ProviderRegistry;

/// Result of a successful command dispatch. The caller mirrors both fields
/// into the shared-memory header so consumers can observe them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchOutcome {
    pub provider: &'static str,
    /// Set only by commands that imply a positioning accuracy change.
    pub accuracy: Option<f64>,
}

/// Map a free-text command onto a provider activation.
///
/// Matching is case-insensitive substring search. Foot and vehicle
/// activities fall back to the cycling provider with an adjusted accuracy
/// level; anything unrecognised is rejected with no state change.
pub fn dispatch_command(command: &str, registry: &mut ProviderRegistry) -> Option<DispatchOutcome> {
    let cmd = command.to_lowercase();
    tracing::debug!(command = %cmd, "processing command");

    let (provider, accuracy): (&'static str, Option<f64>) =
        if cmd.contains("cycling") || cmd.contains("bike") {
            ("cycling", None)
        } else if cmd.contains("dating") || cmd.contains("tinder") {
            ("dating", None)
        } else if cmd.contains("delivery") {
            ("delivery", None)
        } else if cmd.contains("running") || cmd.contains("walking") {
            // Foot traffic: highest positioning fidelity.
            ("cycling", Some(1.0))
        } else if cmd.contains("driving") || cmd.contains("car") {
            // Vehicular: coarser positioning is fine.
            ("cycling", Some(0.5))
        } else {
            tracing::warn!(command = %command, "unknown command");
            return None;
        };

    if !registry.activate(provider) {
        return None;
    }

    Some(DispatchOutcome {
        provider,
        accuracy: accuracy.map(|a| a.clamp(0.0, 1.0)),
    })
}
