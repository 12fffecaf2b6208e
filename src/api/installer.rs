//! Installer.
//!
//! Performs the one-time substitution of the process's entry points after a
//! Permitted gate verdict. A second call is reported, never absorbed: two
//! managers believing they own the same memory is the failure this guards
//! against.
//!
//! Another module can still win the swap between a Permitted verdict and the
//! substitution. The failed swap changes nothing, so losing it is a
//! rejection, not a fatal failure.

use crate::api::error::{InstallError, LifecycleError};
use crate::api::events::LifecycleEvent;
use crate::api::gate::RejectReason;
use crate::core::process::{InstallationStatus, ProcessContext};
use crate::diagnostics::{self, AS201, AS202, AS203};
use crate::managers::ReplacementManager;

/// Substitute `ctx`'s entry points with `manager`'s.
///
/// Precondition: the manager is initialized and the gate permitted
/// substitution. On `FatalInstallFailure` the caller must not let the
/// process continue; the binder enforces this through the context's
/// [`FatalPolicy`](crate::FatalPolicy).
///
/// Returns `GateRejected` with status `InstallRejected` if another
/// allocator took the entry points first.
pub fn install(ctx: &ProcessContext, manager: &'static dyn ReplacementManager) -> Result<(), LifecycleError> {
    match ctx.status() {
        InstallationStatus::NotInstalled => {}
        InstallationStatus::Installed | InstallationStatus::Uninstalled => {
            return Err(report_double_install(ctx, manager));
        }
        InstallationStatus::InstallRejected => {
            diagnostics::emit_with_context(&AS203, manager.name());
            return Err(LifecycleError::InstallAfterRejection);
        }
    }

    if !ctx.manager_state().is_initialized() {
        diagnostics::emit_with_context(&AS202, manager.name());
        return Err(LifecycleError::ManagerNotInitialized);
    }

    match manager.install(ctx.table()) {
        Ok(()) => {}
        Err(InstallError::EntryPointsChanged { found }) if !ctx.table().is_original() => {
            let _ = ctx.advance(InstallationStatus::InstallRejected);
            return Err(LifecycleError::GateRejected(RejectReason::ConflictingAllocatorActive {
                active: found,
            }));
        }
        Err(err) => return Err(LifecycleError::FatalInstallFailure(err)),
    }

    if ctx.advance(InstallationStatus::Installed).is_err() {
        // Status moved concurrently on the same context.
        return Err(report_double_install(ctx, manager));
    }

    #[cfg(feature = "debug")]
    ctx.install_site().record();

    ctx.emit(LifecycleEvent::Installed {
        manager: manager.name(),
    });
    Ok(())
}

fn report_double_install(ctx: &ProcessContext, manager: &dyn ReplacementManager) -> LifecycleError {
    ctx.counters().double_install_attempts.increment();
    ctx.emit(LifecycleEvent::DoubleInstallAttempt {
        manager: manager.name(),
    });

    #[cfg(feature = "debug")]
    {
        let first = ctx.install_site().get().unwrap_or_else(|| "<not captured>".to_string());
        diagnostics::emit_with_context(&AS201, &format!("{}; first installed at:\n{}", manager.name(), first));
    }
    #[cfg(not(feature = "debug"))]
    diagnostics::emit_with_context(&AS201, manager.name());

    LifecycleError::DoubleInstallAttempt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::LifecycleConfig;
    use crate::core::entry::EntryTable;
    use crate::managers::CountingManager;

    fn context() -> &'static ProcessContext {
        let table: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
        Box::leak(Box::new(ProcessContext::new(table, LifecycleConfig::default())))
    }

    fn manager() -> &'static CountingManager {
        Box::leak(Box::new(CountingManager::new("counting")))
    }

    #[test]
    fn test_requires_initialized_manager() {
        let ctx = context();
        let err = install(ctx, manager()).unwrap_err();
        assert_eq!(err, LifecycleError::ManagerNotInitialized);
        assert_eq!(ctx.status(), InstallationStatus::NotInstalled);
        assert!(ctx.table().is_original());
    }

    #[test]
    fn test_install_then_double_install() {
        let ctx = context();
        let manager = manager();
        manager.initialize();
        ctx.manager_state().mark_initialized();

        install(ctx, manager).unwrap();
        assert_eq!(ctx.status(), InstallationStatus::Installed);
        assert_eq!(ctx.table().active().name(), "counting");

        assert_eq!(install(ctx, manager), Err(LifecycleError::DoubleInstallAttempt));
        assert_eq!(ctx.status(), InstallationStatus::Installed);
        assert_eq!(ctx.stats().double_install_attempts, 1);
    }

    #[test]
    fn test_lost_substitution_race_is_rejection() {
        let table: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
        let winner_ctx: &'static ProcessContext =
            Box::leak(Box::new(ProcessContext::new(table, LifecycleConfig::default())));
        let loser_ctx: &'static ProcessContext =
            Box::leak(Box::new(ProcessContext::new(table, LifecycleConfig::default())));

        let winner: &'static CountingManager = Box::leak(Box::new(CountingManager::new("winner")));
        let loser: &'static CountingManager = Box::leak(Box::new(CountingManager::new("loser")));
        for (ctx, manager) in [(winner_ctx, winner), (loser_ctx, loser)] {
            manager.initialize();
            ctx.manager_state().mark_initialized();
        }

        install(winner_ctx, winner).unwrap();
        let err = install(loser_ctx, loser).unwrap_err();

        assert_eq!(
            err,
            LifecycleError::GateRejected(RejectReason::ConflictingAllocatorActive { active: "winner" })
        );
        assert!(!err.is_fatal());
        assert_eq!(loser_ctx.status(), InstallationStatus::InstallRejected);
        assert_eq!(table.active().name(), "winner");
    }

    #[test]
    fn test_refuses_after_rejection() {
        let ctx = context();
        ctx.advance(InstallationStatus::InstallRejected).unwrap();
        ctx.manager_state().mark_initialized();

        assert_eq!(install(ctx, manager()), Err(LifecycleError::InstallAfterRejection));
        assert!(ctx.table().is_original());
    }
}
