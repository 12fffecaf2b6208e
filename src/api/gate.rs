//! Compatibility gate.
//!
//! Decides whether substituting the process's entry points is safe right
//! now. The gate only reads ambient state: calling it any number of times
//! changes nothing, and a rejection leaves the allocation subsystem exactly
//! as it found it. Reporting a rejection is the binder's job.

use crate::core::process::{InstallationStatus, ProcessContext};
use crate::managers::{Detection, ReplacementManager};

/// Why the gate refused substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// This context has already installed (or uninstalled) its manager.
    AlreadyInstalled,
    /// Another allocator already owns the process's entry points.
    ConflictingAllocatorActive {
        /// Name of the active entry points.
        active: &'static str,
    },
    /// The module shares its allocator state with the host runtime.
    SharedRuntimeAllocator,
    /// The original entry points have already served requests and the
    /// context requires untouched entry points.
    AllocationsAlreadyServed {
        /// Requests served so far.
        requests: u64,
    },
    /// The manager reported a conflicting instance of itself.
    ManagerConflict,
    /// The manager could not tell whether a conflict exists.
    DetectionInconclusive,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInstalled => write!(f, "a replacement allocator is already installed by this module"),
            Self::ConflictingAllocatorActive { active } => {
                write!(f, "conflicting allocator `{}` is already active", active)
            }
            Self::SharedRuntimeAllocator => write!(f, "module shares the host runtime's allocator"),
            Self::AllocationsAlreadyServed { requests } => {
                write!(f, "original allocator already served {} requests", requests)
            }
            Self::ManagerConflict => write!(f, "another instance of the replacement allocator is active"),
            Self::DetectionInconclusive => write!(f, "conflict detection was inconclusive"),
        }
    }
}

/// The gate's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateVerdict {
    /// Substitution is safe.
    Permitted,
    /// Substitution must not happen.
    Rejected(RejectReason),
}

impl GateVerdict {
    /// Whether substitution is permitted.
    pub fn is_permitted(&self) -> bool {
        matches!(self, GateVerdict::Permitted)
    }
}

/// Check whether `manager` may take over `ctx`'s entry table.
///
/// Checks run cheapest and most authoritative first; the first failing
/// check decides the reason.
pub fn check(ctx: &ProcessContext, manager: &dyn ReplacementManager) -> GateVerdict {
    match check_inner(ctx, manager) {
        Ok(()) => GateVerdict::Permitted,
        Err(reason) => GateVerdict::Rejected(reason),
    }
}

fn check_inner(ctx: &ProcessContext, manager: &dyn ReplacementManager) -> Result<(), RejectReason> {
    if matches!(ctx.status(), InstallationStatus::Installed | InstallationStatus::Uninstalled) {
        return Err(RejectReason::AlreadyInstalled);
    }

    let table = ctx.table();
    if !table.is_original() {
        return Err(RejectReason::ConflictingAllocatorActive {
            active: table.active().name(),
        });
    }

    if ctx.config().shared_runtime_allocator {
        return Err(RejectReason::SharedRuntimeAllocator);
    }

    if ctx.requires_pristine() {
        let requests = table.original_requests();
        if requests > 0 {
            return Err(RejectReason::AllocationsAlreadyServed { requests });
        }
    }

    match manager.can_install(table) {
        Detection::Compatible => Ok(()),
        Detection::Conflict => Err(RejectReason::ManagerConflict),
        Detection::Inconclusive => Err(RejectReason::DetectionInconclusive),
    }
}
