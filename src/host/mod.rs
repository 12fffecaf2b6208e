//! Host runtime hook interface.
//!
//! The lifecycle binder never talks to a concrete runtime. It registers two
//! argument-less callbacks through [`HostHooks`], so the same binder drives a
//! real module loader, [`HookTable`], or a test double.

mod table;

pub use table::HookTable;

use std::sync::Arc;

/// A startup or shutdown callback.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Ordering slot of a hook.
///
/// Lower values run earlier on startup and later on shutdown, so priority 0
/// brackets everything else the module does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookPriority(pub u8);

impl HookPriority {
    /// Slot reserved for the allocator layer: first in, last out.
    pub const ALLOCATOR: Self = Self(0);
    /// First slot available to library code other than the allocator layer.
    pub const LIBRARY: Self = Self(64);
    /// Default slot for application hooks.
    pub const DEFAULT: Self = Self(100);
}

impl Default for HookPriority {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Registration surface of a host's module load/unload notifications.
pub trait HostHooks {
    /// Register a hook to run when the module loads.
    fn register_startup(&self, priority: HookPriority, hook: Hook);

    /// Register a hook to run when the module unloads.
    fn register_shutdown(&self, priority: HookPriority, hook: Hook);

    /// Whether a startup hook at `priority` is guaranteed to finish before
    /// any other code in the module runs.
    ///
    /// Hosts that only promise "some time during load" return `false`; the
    /// gate then refuses substitution once the original entry points have
    /// served any request.
    fn runs_before_module_code(&self, priority: HookPriority) -> bool {
        priority == HookPriority::ALLOCATOR
    }
}
