//! Lifecycle events.
//!
//! Observers registered with [`ProcessContext::on_event`](crate::ProcessContext::on_event)
//! see every decision the installation protocol makes, in order, on the
//! thread running the host hook.

use crate::api::gate::RejectReason;
use crate::api::uninstaller::SkipReason;

/// A lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The replacement manager's internal state is ready.
    Initialized {
        /// Name of the replacement manager.
        manager: &'static str,
    },
    /// The compatibility gate reached a verdict.
    GateChecked {
        /// Whether substitution may proceed.
        permitted: bool,
    },
    /// The replacement manager now serves all requests.
    Installed {
        /// Name of the replacement manager.
        manager: &'static str,
    },
    /// Substitution was rejected; the original manager stays active.
    InstallRejected {
        /// Why substitution was refused.
        reason: RejectReason,
    },
    /// The installer ran after substitution had already happened.
    DoubleInstallAttempt {
        /// Name of the replacement manager.
        manager: &'static str,
    },
    /// The shutdown hook left the replacement manager in place.
    UninstallSkipped {
        /// Why the original entry points were not restored.
        reason: SkipReason,
    },
    /// A verified uninstall restored the original entry points.
    Uninstalled {
        /// Name of the replacement manager.
        manager: &'static str,
    },
}

/// Callback type for lifecycle events.
pub type EventCallback = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;
