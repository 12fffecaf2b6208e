//! Replacement allocator interface.
//!
//! The lifecycle layer consumes a replacement allocator only through
//! [`ReplacementManager`]. Its internals (size classes, free lists, caches)
//! are the implementor's business.

mod counting;
mod registry;

pub use counting::{CountingManager, CountingStats};

use crate::api::error::InstallError;
use crate::core::entry::EntryTable;

/// Outcome of a manager's own compatibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Detection {
    /// No conflicting instance is active.
    Compatible,
    /// A conflicting instance is active.
    Conflict,
    /// The check could not reach a verdict.
    Inconclusive,
}

impl From<bool> for Detection {
    fn from(can_install: bool) -> Self {
        if can_install {
            Detection::Compatible
        } else {
            Detection::Conflict
        }
    }
}

/// A replacement allocator, seen from the lifecycle layer.
///
/// The layer calls `initialize` once, then `can_install`, then (if the gate
/// permits) `install` once. Managers are `'static`: once installed they own
/// the process's live allocations until exit.
pub trait ReplacementManager: Send + Sync {
    /// Name used in diagnostics and events.
    fn name(&self) -> &'static str;

    /// Prepare internal state. Called exactly once, before any allocation
    /// can reach the manager and before `can_install`.
    fn initialize(&self);

    /// Allocator-specific compatibility check, e.g. whether another
    /// instance of the same allocator is already active. Must be read-only.
    fn can_install(&self, table: &EntryTable) -> Detection;

    /// Substitute the table's entry points with this manager's.
    ///
    /// Either fully succeeds or leaves the table untouched and returns an
    /// error; the caller treats the error as fatal.
    fn install(&'static self, table: &EntryTable) -> Result<(), InstallError>;

    /// Number of blocks this manager handed out that are still live, if it
    /// can prove the count.
    ///
    /// Frees of blocks served before substitution also arrive here. A
    /// manager that cannot tell those apart from its own must return `None`.
    fn live_allocations(&self) -> Option<usize> {
        None
    }

    /// Restore the table's original entry points. Only called after
    /// `live_allocations` returned `Some(0)`.
    fn uninstall(&'static self, table: &EntryTable) -> Result<(), InstallError> {
        let _ = table;
        Err(InstallError::Unsupported)
    }
}
