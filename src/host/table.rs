//! In-process hook table.
//!
//! A minimal host: modules (or tests) register hooks, the embedder calls
//! [`HookTable::load`] and [`HookTable::unload`] at the module boundary.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::host::{Hook, HookPriority, HostHooks};
use crate::sync::mutex::Mutex;

struct Registered {
    priority: HookPriority,
    seq: u64,
    hook: Hook,
}

/// Ordered startup and shutdown hooks for one module.
pub struct HookTable {
    startup: Mutex<Vec<Registered>>,
    shutdown: Mutex<Vec<Registered>>,
    next_seq: AtomicU64,
    ordered: bool,
}

impl HookTable {
    /// A host that runs priority-0 startup hooks before module code.
    pub fn new() -> Self {
        Self::with_ordering(true)
    }

    /// A host that only promises hooks run at some point during load.
    pub fn unordered() -> Self {
        Self::with_ordering(false)
    }

    fn with_ordering(ordered: bool) -> Self {
        Self {
            startup: Mutex::new(Vec::new()),
            shutdown: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(0),
            ordered,
        }
    }

    /// Run startup hooks: ascending priority, then registration order.
    pub fn load(&self) {
        let mut hooks = Self::snapshot(&self.startup);
        hooks.sort_by_key(|(priority, seq, _)| (*priority, *seq));
        for (_, _, hook) in hooks {
            hook();
        }
    }

    /// Run shutdown hooks: descending priority, then reverse registration
    /// order, so the earliest startup slot is torn down last.
    pub fn unload(&self) {
        let mut hooks = Self::snapshot(&self.shutdown);
        hooks.sort_by_key(|(priority, seq, _)| std::cmp::Reverse((*priority, *seq)));
        for (_, _, hook) in hooks {
            hook();
        }
    }

    /// Number of registered startup hooks.
    pub fn startup_len(&self) -> usize {
        self.startup.lock().len()
    }

    /// Number of registered shutdown hooks.
    pub fn shutdown_len(&self) -> usize {
        self.shutdown.lock().len()
    }

    // Hooks run outside the lock so they may register further hooks.
    fn snapshot(list: &Mutex<Vec<Registered>>) -> Vec<(HookPriority, u64, Hook)> {
        list.lock()
            .iter()
            .map(|r| (r.priority, r.seq, Hook::clone(&r.hook)))
            .collect()
    }

    fn push(&self, list: &Mutex<Vec<Registered>>, priority: HookPriority, hook: Hook) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        list.lock().push(Registered { priority, seq, hook });
    }
}

impl Default for HookTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HostHooks for HookTable {
    fn register_startup(&self, priority: HookPriority, hook: Hook) {
        self.push(&self.startup, priority, hook);
    }

    fn register_shutdown(&self, priority: HookPriority, hook: Hook) {
        self.push(&self.shutdown, priority, hook);
    }

    fn runs_before_module_code(&self, priority: HookPriority) -> bool {
        self.ordered && priority == HookPriority::ALLOCATOR
    }
}
