//! Lifecycle binder.
//!
//! Ties the install sequence and the uninstall attempt to the host's module
//! hooks, both in the [`HookPriority::ALLOCATOR`] slot: install runs before
//! anything else in the module, the uninstall attempt after everything else.
//!
//! ```text
//! Unbound --bind--> Bound --load--> Initializing --ready--> GateChecking
//! GateChecking --Permitted--> Installed
//! GateChecking --Rejected---> NotInstalled
//! Installed --unload--> Installed          (uninstall skipped)
//! Installed --unload--> Uninstalled        (verified uninstall only)
//! ```

use std::sync::Arc;

use crate::api::error::LifecycleError;
use crate::api::events::LifecycleEvent;
use crate::api::gate::{self, GateVerdict, RejectReason};
use crate::api::installer;
use crate::api::uninstaller::{self, UninstallOutcome};
use crate::core::process::{BinderPhase, InstallationStatus, ProcessContext};
use crate::diagnostics::{self, AS101, AS102, AS401, AS402, AS403};
use crate::host::{HookPriority, HostHooks};
use crate::managers::ReplacementManager;

/// Binds one replacement manager to one process context.
#[derive(Clone, Copy)]
pub struct LifecycleBinder {
    ctx: &'static ProcessContext,
    manager: &'static dyn ReplacementManager,
}

impl LifecycleBinder {
    /// Create a binder. Nothing is registered until [`bind`](Self::bind).
    pub fn new(ctx: &'static ProcessContext, manager: &'static dyn ReplacementManager) -> Self {
        Self { ctx, manager }
    }

    /// The context this binder drives.
    pub fn context(&self) -> &'static ProcessContext {
        self.ctx
    }

    /// Register the startup and shutdown hooks with `host`.
    ///
    /// Succeeds once per context. Hooks are never unregistered.
    pub fn bind<H>(&self, host: &H) -> Result<(), LifecycleError>
    where
        H: HostHooks + ?Sized,
    {
        if self.ctx.transition_phase(BinderPhase::Unbound, BinderPhase::Bound).is_err() {
            diagnostics::emit_with_context(&AS401, self.manager.name());
            return Err(LifecycleError::AlreadyBound);
        }

        if !host.runs_before_module_code(HookPriority::ALLOCATOR) {
            diagnostics::emit_with_context(&AS403, self.manager.name());
            self.ctx.mark_ordering_unverified();
        }

        let binder = *self;
        host.register_startup(HookPriority::ALLOCATOR, Arc::new(move || binder.startup()));
        host.register_shutdown(HookPriority::ALLOCATOR, Arc::new(move || {
            binder.shutdown();
        }));
        Ok(())
    }

    /// Module-load hook: initialize, consult the gate, install if permitted.
    ///
    /// Runs the sequence once; later invocations are reported and ignored.
    pub fn startup(&self) {
        let ctx = self.ctx;
        if ctx.transition_phase(BinderPhase::Bound, BinderPhase::Initializing).is_err() {
            ctx.counters().repeated_startups.increment();
            diagnostics::emit_with_context(&AS402, self.manager.name());
            return;
        }

        // The manager must be fully initialized before the gate can permit
        // anything, so no request ever reaches a half-built manager.
        if !ctx.manager_state().is_initialized() {
            self.manager.initialize();
            ctx.manager_state().mark_initialized();
        }
        ctx.emit(LifecycleEvent::Initialized {
            manager: self.manager.name(),
        });
        ctx.set_phase(BinderPhase::GateChecking);

        let verdict = gate::check(ctx, self.manager);
        ctx.emit(LifecycleEvent::GateChecked {
            permitted: verdict.is_permitted(),
        });

        match verdict {
            GateVerdict::Permitted => match installer::install(ctx, self.manager) {
                Ok(()) => ctx.set_phase(BinderPhase::Installed),
                Err(LifecycleError::GateRejected(reason)) => self.reject(reason),
                Err(err) if err.is_fatal() => ctx.fatal(err),
                // Reported by the installer; nothing was substituted.
                Err(_) => ctx.set_phase(BinderPhase::NotInstalled),
            },
            GateVerdict::Rejected(reason) => self.reject(reason),
        }
    }

    /// Module-unload hook: attempt the uninstall, which is a deliberate
    /// no-op unless it can be verified.
    pub fn shutdown(&self) -> UninstallOutcome {
        let outcome = uninstaller::uninstall(self.ctx, self.manager);
        if outcome == UninstallOutcome::Uninstalled {
            self.ctx.set_phase(BinderPhase::Uninstalled);
        }
        outcome
    }

    fn reject(&self, reason: RejectReason) {
        let ctx = self.ctx;
        // Already advanced when the installer lost a substitution race.
        let _ = ctx.advance(InstallationStatus::InstallRejected);
        ctx.counters().gate_rejections.increment();
        ctx.emit(LifecycleEvent::InstallRejected { reason });
        ctx.set_phase(BinderPhase::NotInstalled);

        let diag = match reason {
            RejectReason::DetectionInconclusive => &AS102,
            _ => &AS101,
        };
        diagnostics::emit_with_context(diag, &format!("{}: {}", self.manager.name(), reason));
    }
}

impl std::fmt::Debug for LifecycleBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleBinder")
            .field("manager", &self.manager.name())
            .field("ctx", self.ctx)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::config::LifecycleConfig;
    use crate::core::entry::EntryTable;
    use crate::host::HookTable;
    use crate::managers::CountingManager;

    fn binder(config: LifecycleConfig) -> LifecycleBinder {
        let table: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
        let ctx: &'static ProcessContext = Box::leak(Box::new(ProcessContext::new(table, config)));
        let manager: &'static CountingManager = Box::leak(Box::new(CountingManager::new("counting")));
        LifecycleBinder::new(ctx, manager)
    }

    #[test]
    fn test_bind_registers_once() {
        let binder = binder(LifecycleConfig::default());
        let host = HookTable::new();

        binder.bind(&host).unwrap();
        assert_eq!(binder.bind(&host), Err(LifecycleError::AlreadyBound));
        assert_eq!(host.startup_len(), 1);
        assert_eq!(host.shutdown_len(), 1);
        assert_eq!(binder.context().phase(), BinderPhase::Bound);
    }

    #[test]
    fn test_startup_before_bind_is_ignored() {
        let binder = binder(LifecycleConfig::default());
        binder.startup();

        let ctx = binder.context();
        assert_eq!(ctx.phase(), BinderPhase::Unbound);
        assert!(!ctx.manager_state().is_initialized());
        assert_eq!(ctx.stats().repeated_startups, 1);
    }

    #[test]
    fn test_repeated_load_runs_sequence_once() {
        let binder = binder(LifecycleConfig::default());
        let host = HookTable::new();
        binder.bind(&host).unwrap();

        host.load();
        host.load();

        let ctx = binder.context();
        assert_eq!(ctx.phase(), BinderPhase::Installed);
        assert_eq!(ctx.status(), InstallationStatus::Installed);
        assert_eq!(ctx.stats().repeated_startups, 1);
        assert_eq!(ctx.stats().double_install_attempts, 0);
    }

    #[test]
    fn test_unordered_host_requires_pristine() {
        let binder = binder(LifecycleConfig::default());
        let host = HookTable::unordered();
        binder.bind(&host).unwrap();
        assert!(binder.context().requires_pristine());
    }
}
