//! Lifecycle statistics.

use crate::core::process::{BinderPhase, InstallationStatus};

/// Snapshot of a process context's diagnostic counters.
///
/// `skipped_uninstalls` is the operator-facing answer to "why does memory
/// attributed to this module persist until exit".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleStats {
    /// Installation status at snapshot time.
    pub status: InstallationStatus,
    /// Binder phase at snapshot time.
    pub phase: BinderPhase,
    /// Startup hooks that ended in a gate rejection.
    pub gate_rejections: u64,
    /// Installer calls after substitution already happened.
    pub double_install_attempts: u64,
    /// Shutdown hooks that deliberately left the manager installed.
    pub skipped_uninstalls: u64,
    /// Startup hook invocations that did not run the install sequence.
    pub repeated_startups: u64,
    /// Requests served by the original entry points.
    pub original_requests: u64,
    /// Requests served by the replacement entry points.
    pub replacement_requests: u64,
}

impl std::fmt::Display for LifecycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lifecycle Statistics:")?;
        writeln!(f, "  Status:               {}", self.status)?;
        writeln!(f, "  Phase:                {:?}", self.phase)?;
        writeln!(f, "  Gate rejections:      {}", self.gate_rejections)?;
        writeln!(f, "  Double installs:      {}", self.double_install_attempts)?;
        writeln!(f, "  Skipped uninstalls:   {}", self.skipped_uninstalls)?;
        writeln!(f, "  Repeated startups:    {}", self.repeated_startups)?;
        writeln!(f, "  Original requests:    {}", self.original_requests)?;
        writeln!(f, "  Replacement requests: {}", self.replacement_requests)?;
        Ok(())
    }
}
