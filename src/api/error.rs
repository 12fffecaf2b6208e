//! Error types for the installation protocol.

use crate::api::gate::RejectReason;

/// Failure reported by a replacement manager while swapping entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallError {
    /// The entry table no longer held the expected entry points.
    EntryPointsChanged {
        /// Name of the entry points that were actually active.
        found: &'static str,
    },
    /// The manager does not support this operation.
    Unsupported,
    /// Manager-specific failure.
    Manager(&'static str),
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryPointsChanged { found } => {
                write!(f, "entry points changed underneath the swap (found `{}`)", found)
            }
            Self::Unsupported => write!(f, "operation not supported by this manager"),
            Self::Manager(msg) => write!(f, "manager failure: {}", msg),
        }
    }
}

impl std::error::Error for InstallError {}

/// Errors surfaced by the lifecycle layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Hooks were already registered for this process context.
    AlreadyBound,
    /// The process-wide context was already created.
    GlobalContextExists,
    /// Installation was attempted before the manager was initialized.
    ManagerNotInitialized,
    /// Installation was attempted after the gate rejected substitution.
    InstallAfterRejection,
    /// Substitution was rejected, including by losing the swap to another
    /// allocator after the gate permitted it.
    GateRejected(RejectReason),
    /// The installer ran after substitution had already happened.
    DoubleInstallAttempt,
    /// The manager failed to take over after the gate permitted it.
    FatalInstallFailure(InstallError),
}

impl LifecycleError {
    /// Whether this error leaves allocator ownership indeterminate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalInstallFailure(_))
    }
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyBound => write!(f, "lifecycle hooks already bound"),
            Self::GlobalContextExists => write!(f, "process context already initialized"),
            Self::ManagerNotInitialized => write!(f, "replacement manager not initialized"),
            Self::InstallAfterRejection => write!(f, "install attempted after gate rejection"),
            Self::GateRejected(reason) => write!(f, "substitution rejected: {}", reason),
            Self::DoubleInstallAttempt => write!(f, "replacement manager already installed"),
            Self::FatalInstallFailure(err) => write!(f, "fatal install failure: {}", err),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FatalInstallFailure(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_fatal_failure_exposes_source() {
        let err = LifecycleError::FatalInstallFailure(InstallError::Manager("arena mmap failed"));
        assert!(err.is_fatal());
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("manager failure: arena mmap failed"));
        assert!(!LifecycleError::DoubleInstallAttempt.is_fatal());
    }
}
