//! Uninstaller.
//!
//! Restoring the original entry points is only sound once nothing the
//! replacement manager handed out is still live. When the host tears down
//! other parts of the runtime before this hook runs, that proof cannot be
//! obtained, and the uninstaller does nothing at all: the replacement stays
//! the process's allocator until exit. There is no partial uninstall.

use crate::api::error::InstallError;
use crate::api::events::LifecycleEvent;
use crate::core::process::{InstallationStatus, ProcessContext};
use crate::diagnostics::{self, AS301, AS302};
use crate::managers::ReplacementManager;

/// Why the uninstaller left the replacement manager in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The host does not guarantee this is the module's final teardown.
    UnverifiableEnvironment,
    /// The manager cannot prove how many blocks are live.
    LiveAllocationsUnknown,
    /// Blocks allocated by the manager are still live.
    LiveAllocations(usize),
    /// The manager could not swap the entry points back.
    RestoreFailed(InstallError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnverifiableEnvironment => write!(f, "host teardown order cannot be verified"),
            Self::LiveAllocationsUnknown => write!(f, "live allocation count is unknown"),
            Self::LiveAllocations(count) => write!(f, "{} allocations are still live", count),
            Self::RestoreFailed(err) => write!(f, "restore failed: {}", err),
        }
    }
}

/// What the shutdown hook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UninstallOutcome {
    /// Nothing was installed, so there was nothing to undo.
    NothingInstalled,
    /// The replacement manager was deliberately left in place.
    Skipped(SkipReason),
    /// The original entry points were restored.
    Uninstalled,
}

/// Attempt to restore `ctx`'s original entry points.
pub fn uninstall(ctx: &ProcessContext, manager: &'static dyn ReplacementManager) -> UninstallOutcome {
    if ctx.status() != InstallationStatus::Installed {
        return UninstallOutcome::NothingInstalled;
    }

    if let Err(reason) = verify_and_restore(ctx, manager) {
        ctx.counters().skipped_uninstalls.increment();
        ctx.emit(LifecycleEvent::UninstallSkipped { reason });

        let context = format!("{}: {}", manager.name(), reason);
        match reason {
            SkipReason::RestoreFailed(_) => diagnostics::emit_with_context(&AS302, &context),
            _ => diagnostics::emit_with_context(&AS301, &context),
        }
        return UninstallOutcome::Skipped(reason);
    }

    // Installed -> Uninstalled is the only transition left from here.
    let _ = ctx.advance(InstallationStatus::Uninstalled);
    ctx.emit(LifecycleEvent::Uninstalled {
        manager: manager.name(),
    });
    UninstallOutcome::Uninstalled
}

fn verify_and_restore(ctx: &ProcessContext, manager: &'static dyn ReplacementManager) -> Result<(), SkipReason> {
    if !ctx.config().safe_uninstall_supported {
        return Err(SkipReason::UnverifiableEnvironment);
    }

    match manager.live_allocations() {
        Some(0) => {}
        Some(live) => return Err(SkipReason::LiveAllocations(live)),
        None => return Err(SkipReason::LiveAllocationsUnknown),
    }

    manager.uninstall(ctx.table()).map_err(SkipReason::RestoreFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::LifecycleConfig;
    use crate::api::installer;
    use crate::core::entry::EntryTable;
    use crate::managers::CountingManager;
    use std::alloc::{GlobalAlloc, Layout};

    fn installed(config: LifecycleConfig) -> (&'static ProcessContext, &'static CountingManager) {
        let table: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
        let ctx: &'static ProcessContext = Box::leak(Box::new(ProcessContext::new(table, config)));
        let manager: &'static CountingManager = Box::leak(Box::new(CountingManager::new("counting")));
        manager.initialize();
        ctx.manager_state().mark_initialized();
        installer::install(ctx, manager).unwrap();
        (ctx, manager)
    }

    #[test]
    fn test_noop_when_nothing_installed() {
        let table: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
        let ctx = ProcessContext::new(table, LifecycleConfig::default());
        let manager: &'static CountingManager = Box::leak(Box::new(CountingManager::new("counting")));

        assert_eq!(uninstall(&ctx, manager), UninstallOutcome::NothingInstalled);
        assert_eq!(ctx.stats().skipped_uninstalls, 0);
    }

    #[test]
    fn test_unverifiable_environment_skips() {
        let (ctx, manager) = installed(LifecycleConfig::default());

        let outcome = uninstall(ctx, manager);
        assert_eq!(outcome, UninstallOutcome::Skipped(SkipReason::UnverifiableEnvironment));
        assert_eq!(ctx.status(), InstallationStatus::Installed);
        assert_eq!(ctx.table().active().name(), "counting");
        assert_eq!(ctx.stats().skipped_uninstalls, 1);
    }

    #[test]
    fn test_live_allocations_block_uninstall() {
        let (ctx, manager) = installed(LifecycleConfig::default().with_safe_uninstall(true));
        let layout = Layout::new::<[u8; 32]>();
        let ptr = unsafe { ctx.table().alloc(layout) };

        assert_eq!(
            uninstall(ctx, manager),
            UninstallOutcome::Skipped(SkipReason::LiveAllocations(1))
        );
        assert!(!ctx.table().is_original());

        unsafe { ctx.table().dealloc(ptr, layout) };
        assert_eq!(uninstall(ctx, manager), UninstallOutcome::Uninstalled);
        assert_eq!(ctx.status(), InstallationStatus::Uninstalled);
        assert!(ctx.table().is_original());
    }
}
