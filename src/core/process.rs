//! Process-scope lifecycle state.
//!
//! A [`ProcessContext`] is the single owner of everything the installation
//! protocol mutates: the entry table it guards, the manager's
//! initialization flag, the installation status and the binder phase.
//! Real processes create one through [`ProcessContext::init_global`];
//! tests create as many as they like with [`ProcessContext::new`], each
//! standing in for a fresh process boundary.
//!
//! Contexts are never torn down.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;

use crate::api::config::{FatalPolicy, LifecycleConfig};
use crate::api::error::LifecycleError;
use crate::api::events::{EventCallback, LifecycleEvent};
use crate::api::stats::LifecycleStats;
use crate::core::entry::EntryTable;
use crate::diagnostics::{self, AS901};
use crate::sync::atomics::AtomicCounter;
use crate::sync::mutex::Mutex;

/// Whether the process's entry points resolve to the replacement manager.
///
/// Transitions only move forward:
/// `NotInstalled -> Installed`, `NotInstalled -> InstallRejected`, and
/// (verified uninstall only) `Installed -> Uninstalled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallationStatus {
    /// Nothing has been installed yet.
    NotInstalled = 0,
    /// The replacement manager serves all requests.
    Installed = 1,
    /// The gate rejected substitution; the original manager stays active.
    InstallRejected = 2,
    /// A verified uninstall restored the original entry points.
    Uninstalled = 3,
}

impl InstallationStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Installed,
            2 => Self::InstallRejected,
            3 => Self::Uninstalled,
            _ => Self::NotInstalled,
        }
    }

    /// Whether `self -> next` is a permitted transition.
    pub fn can_advance_to(self, next: InstallationStatus) -> bool {
        matches!(
            (self, next),
            (Self::NotInstalled, Self::Installed)
                | (Self::NotInstalled, Self::InstallRejected)
                | (Self::Installed, Self::Uninstalled)
        )
    }
}

impl std::fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "not installed"),
            Self::Installed => write!(f, "installed"),
            Self::InstallRejected => write!(f, "install rejected"),
            Self::Uninstalled => write!(f, "uninstalled"),
        }
    }
}

/// Phase of the lifecycle binder's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinderPhase {
    /// No hooks registered.
    Unbound = 0,
    /// Hooks registered, module not loaded yet.
    Bound = 1,
    /// Startup hook is initializing the manager.
    Initializing = 2,
    /// Startup hook is consulting the gate.
    GateChecking = 3,
    /// Substitution done. Terminal in unverifiable environments.
    Installed = 4,
    /// Substitution rejected. Terminal.
    NotInstalled = 5,
    /// Verified uninstall done. Terminal.
    Uninstalled = 6,
}

impl BinderPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Bound,
            2 => Self::Initializing,
            3 => Self::GateChecking,
            4 => Self::Installed,
            5 => Self::NotInstalled,
            6 => Self::Uninstalled,
            _ => Self::Unbound,
        }
    }
}

/// Initialization record of the replacement manager.
///
/// Set once, never cleared.
#[derive(Debug, Default)]
pub struct ManagerState {
    initialized: AtomicBool,
}

impl ManagerState {
    /// Create an uninitialized record.
    pub const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether the manager's internal structures are ready.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Mark the manager ready. Returns `false` if it already was.
    pub(crate) fn mark_initialized(&self) -> bool {
        !self.initialized.swap(true, Ordering::AcqRel)
    }
}

#[derive(Default)]
pub(crate) struct Counters {
    pub gate_rejections: AtomicCounter,
    pub double_install_attempts: AtomicCounter,
    pub skipped_uninstalls: AtomicCounter,
    pub repeated_startups: AtomicCounter,
}

static GLOBAL_CONTEXT: OnceLock<ProcessContext> = OnceLock::new();

/// The process-wide lifecycle record.
pub struct ProcessContext {
    config: LifecycleConfig,
    table: &'static EntryTable,
    manager_state: ManagerState,
    status: AtomicU8,
    phase: AtomicU8,
    ordering_unverified: AtomicBool,
    counters: Counters,
    observers: Mutex<Vec<EventCallback>>,
    #[cfg(feature = "debug")]
    install_site: crate::debug::InstallSite,
}

impl ProcessContext {
    /// Create a context guarding `table`.
    pub fn new(table: &'static EntryTable, config: LifecycleConfig) -> Self {
        Self {
            config,
            table,
            manager_state: ManagerState::new(),
            status: AtomicU8::new(InstallationStatus::NotInstalled as u8),
            phase: AtomicU8::new(BinderPhase::Unbound as u8),
            ordering_unverified: AtomicBool::new(false),
            counters: Counters::default(),
            observers: Mutex::new(Vec::new()),
            #[cfg(feature = "debug")]
            install_site: crate::debug::InstallSite::new(),
        }
    }

    /// Create the process-wide context. Succeeds once per process.
    pub fn init_global(
        table: &'static EntryTable,
        config: LifecycleConfig,
    ) -> Result<&'static ProcessContext, LifecycleError> {
        GLOBAL_CONTEXT
            .set(Self::new(table, config))
            .map_err(|_| LifecycleError::GlobalContextExists)?;
        GLOBAL_CONTEXT.get().ok_or(LifecycleError::GlobalContextExists)
    }

    /// The process-wide context, if it has been created.
    pub fn global() -> Option<&'static ProcessContext> {
        GLOBAL_CONTEXT.get()
    }

    /// Configuration resolved at creation.
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// The entry table this context guards.
    pub fn table(&self) -> &'static EntryTable {
        self.table
    }

    /// The manager's initialization record.
    pub fn manager_state(&self) -> &ManagerState {
        &self.manager_state
    }

    /// Current installation status.
    pub fn status(&self) -> InstallationStatus {
        InstallationStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Current binder phase.
    pub fn phase(&self) -> BinderPhase {
        BinderPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Whether the gate must see untouched entry points before permitting.
    pub fn requires_pristine(&self) -> bool {
        self.config.require_pristine || self.ordering_unverified.load(Ordering::Acquire)
    }

    /// Register a lifecycle event observer.
    ///
    /// Observers run on the hook thread and must not register observers.
    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.observers.lock().push(Box::new(callback));
    }

    /// Snapshot of the diagnostic counters.
    pub fn stats(&self) -> LifecycleStats {
        LifecycleStats {
            status: self.status(),
            phase: self.phase(),
            gate_rejections: self.counters.gate_rejections.get(),
            double_install_attempts: self.counters.double_install_attempts.get(),
            skipped_uninstalls: self.counters.skipped_uninstalls.get(),
            repeated_startups: self.counters.repeated_startups.get(),
            original_requests: self.table.original_requests(),
            replacement_requests: self.table.replacement_requests(),
        }
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.counters
    }

    pub(crate) fn emit(&self, event: LifecycleEvent) {
        let observers = self.observers.lock();
        for observer in observers.iter() {
            observer(&event);
        }
    }

    /// Move the status forward. Returns the status found on failure.
    pub(crate) fn advance(&self, next: InstallationStatus) -> Result<(), InstallationStatus> {
        let current = self.status();
        if !current.can_advance_to(next) {
            return Err(current);
        }
        self.status
            .compare_exchange(current as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(InstallationStatus::from_u8)
    }

    pub(crate) fn set_phase(&self, phase: BinderPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub(crate) fn transition_phase(&self, from: BinderPhase, to: BinderPhase) -> Result<(), BinderPhase> {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(BinderPhase::from_u8)
    }

    pub(crate) fn mark_ordering_unverified(&self) {
        self.ordering_unverified.store(true, Ordering::Release);
    }

    #[cfg(feature = "debug")]
    pub(crate) fn install_site(&self) -> &crate::debug::InstallSite {
        &self.install_site
    }

    /// Report an unrecoverable lifecycle failure and stop.
    pub(crate) fn fatal(&self, err: LifecycleError) -> ! {
        let context = err.to_string();
        // Strict mode must not pre-empt the configured policy.
        diagnostics::emit::report_with_context(&AS901, &context);

        match self.config.fatal_policy {
            FatalPolicy::Abort => std::process::abort(),
            FatalPolicy::Panic => panic!("[allocswap] fatal: {}", context),
        }
    }
}

impl std::fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessContext")
            .field("status", &self.status())
            .field("phase", &self.phase())
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaked_table() -> &'static EntryTable {
        Box::leak(Box::new(EntryTable::system()))
    }

    #[test]
    fn test_status_only_moves_forward() {
        let ctx = ProcessContext::new(leaked_table(), LifecycleConfig::default());
        assert_eq!(ctx.status(), InstallationStatus::NotInstalled);

        ctx.advance(InstallationStatus::Installed).unwrap();
        assert_eq!(
            ctx.advance(InstallationStatus::NotInstalled),
            Err(InstallationStatus::Installed)
        );
        assert_eq!(
            ctx.advance(InstallationStatus::InstallRejected),
            Err(InstallationStatus::Installed)
        );
        assert_eq!(ctx.status(), InstallationStatus::Installed);
    }

    #[test]
    fn test_rejected_is_terminal() {
        let ctx = ProcessContext::new(leaked_table(), LifecycleConfig::default());
        ctx.advance(InstallationStatus::InstallRejected).unwrap();
        assert!(ctx.advance(InstallationStatus::Installed).is_err());
        assert!(ctx.advance(InstallationStatus::Uninstalled).is_err());
    }

    #[test]
    fn test_manager_state_initializes_once() {
        let state = ManagerState::new();
        assert!(!state.is_initialized());
        assert!(state.mark_initialized());
        assert!(!state.mark_initialized());
        assert!(state.is_initialized());
    }

    #[test]
    fn test_requires_pristine_from_unverified_ordering() {
        let ctx = ProcessContext::new(leaked_table(), LifecycleConfig::default());
        assert!(!ctx.requires_pristine());
        ctx.mark_ordering_unverified();
        assert!(ctx.requires_pristine());
    }

    #[test]
    #[should_panic(expected = "[allocswap] fatal")]
    fn test_fatal_panics_under_panic_policy() {
        let config = LifecycleConfig::default().with_fatal_policy(FatalPolicy::Panic);
        let ctx = ProcessContext::new(leaked_table(), config);
        ctx.fatal(LifecycleError::DoubleInstallAttempt);
    }
}
