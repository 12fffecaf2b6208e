//! # allocswap
//!
//! Safe, one-way substitution of a process's global allocator, bound to
//! the host's module startup and shutdown hooks.
//!
//! ## Features
//!
//! - Switchable `#[global_allocator]` entry table
//! - Read-only compatibility gate (conflicting allocators, shared runtime
//!   allocators, inconclusive detection)
//! - Single, fatal-on-failure installation after the manager is initialized
//! - Uninstall that is a deliberate no-op unless zero live allocations can
//!   be proven
//! - Injectable host hook interface for testing without a real runtime
//! - Coded diagnostics, lifecycle events and counters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use allocswap::{CountingManager, EntryTable, HookTable, LifecycleBinder, LifecycleConfig, ProcessContext};
//!
//! #[global_allocator]
//! static ENTRY: EntryTable = EntryTable::system();
//! static MANAGER: CountingManager = CountingManager::new("counting");
//!
//! let ctx = ProcessContext::init_global(&ENTRY, LifecycleConfig::from_env()).unwrap();
//! let host = HookTable::new();
//! LifecycleBinder::new(ctx, &MANAGER).bind(&host).unwrap();
//!
//! host.load();   // module startup: initialize, gate, install
//! // ... module runs, every allocation goes through MANAGER ...
//! host.unload(); // module shutdown: manager stays installed
//! ```

pub mod api;
pub mod diagnostics;
pub mod host;
pub mod managers;

mod core;
mod sync;

#[cfg(feature = "debug")]
mod debug;

// Re-export public API at crate root for convenience
pub use api::binder::LifecycleBinder;
pub use api::config::{FatalPolicy, LifecycleConfig};
pub use api::error::{InstallError, LifecycleError};
pub use api::events::{EventCallback, LifecycleEvent};
pub use api::gate::{GateVerdict, RejectReason};
pub use api::stats::LifecycleStats;
pub use api::uninstaller::{SkipReason, UninstallOutcome};

// Process-wide state
pub use crate::core::entry::{EntryPoints, EntryTable, SYSTEM_ENTRY_POINTS};
pub use crate::core::process::{BinderPhase, InstallationStatus, ManagerState, ProcessContext};

// Host hooks
pub use host::{Hook, HookPriority, HookTable, HostHooks};

// Replacement managers
pub use managers::{CountingManager, CountingStats, Detection, ReplacementManager};

// Diagnostics
pub use diagnostics::{Diagnostic, DiagnosticKind, StrictMode, StrictModeGuard, set_strict_mode};
