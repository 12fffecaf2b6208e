//! Counting replacement manager.
//!
//! Serves memory from the system heap and keeps request and live-block
//! counts, so routing can be observed from the outside. Usable as-is for
//! tests and benches, and as the template for a real manager's lifecycle
//! glue.
//!
//! Live counts cover only blocks this manager handed out. Once it sees a
//! free of a block it never registered, or hands out a block it could not
//! register, it stops claiming an exact count.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crate::api::error::InstallError;
use crate::core::entry::{EntryPoints, EntryTable};
use crate::managers::registry::BlockRegistry;
use crate::managers::{Detection, ReplacementManager};
use crate::sync::atomics::{AtomicCounter, AtomicGauge};

/// A system-heap-backed manager with request counters.
///
/// ```rust,ignore
/// static MANAGER: CountingManager = CountingManager::new("counting");
/// ```
pub struct CountingManager {
    name: &'static str,
    initialized: AtomicBool,
    entry: OnceLock<EntryPoints>,
    allocations: AtomicCounter,
    deallocations: AtomicCounter,
    reallocations: AtomicCounter,
    live_blocks: AtomicGauge,
    live_bytes: AtomicGauge,
    foreign_frees: AtomicCounter,
    untracked_blocks: AtomicCounter,
    owned: BlockRegistry,
}

/// Snapshot of a [`CountingManager`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountingStats {
    /// `alloc` and `alloc_zeroed` calls served.
    pub allocations: u64,
    /// `dealloc` calls served.
    pub deallocations: u64,
    /// `realloc` calls served.
    pub reallocations: u64,
    /// Registered blocks currently live.
    pub live_blocks: usize,
    /// Bytes in registered blocks currently live.
    pub live_bytes: usize,
    /// Frees of blocks this manager never handed out.
    pub foreign_frees: u64,
    /// Blocks handed out while the registry was full.
    pub untracked_blocks: u64,
}

impl CountingManager {
    /// Create a manager. `const` so it can live in a `static`.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            initialized: AtomicBool::new(false),
            entry: OnceLock::new(),
            allocations: AtomicCounter::new(0),
            deallocations: AtomicCounter::new(0),
            reallocations: AtomicCounter::new(0),
            live_blocks: AtomicGauge::new(0),
            live_bytes: AtomicGauge::new(0),
            foreign_frees: AtomicCounter::new(0),
            untracked_blocks: AtomicCounter::new(0),
            owned: BlockRegistry::new(),
        }
    }

    /// Whether `initialize` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Current counters.
    pub fn stats(&self) -> CountingStats {
        CountingStats {
            allocations: self.allocations.get(),
            deallocations: self.deallocations.get(),
            reallocations: self.reallocations.get(),
            live_blocks: self.live_blocks.get(),
            live_bytes: self.live_bytes.get(),
            foreign_frees: self.foreign_frees.get(),
            untracked_blocks: self.untracked_blocks.get(),
        }
    }

    fn entry_points(&'static self) -> &'static EntryPoints {
        self.entry.get_or_init(|| EntryPoints::new(self.name, self))
    }

    #[inline]
    fn track(&self, ptr: *mut u8, size: usize) {
        if self.owned.insert(ptr) {
            self.live_blocks.add(1);
            self.live_bytes.add(size);
        } else {
            self.untracked_blocks.increment();
        }
    }

    /// Returns whether `ptr` was one of ours.
    #[inline]
    fn untrack(&self, ptr: *mut u8, size: usize) -> bool {
        if self.owned.remove(ptr) {
            self.live_blocks.saturating_sub(1);
            self.live_bytes.saturating_sub(size);
            true
        } else {
            self.foreign_frees.increment();
            false
        }
    }
}

unsafe impl GlobalAlloc for CountingManager {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            self.allocations.increment();
            self.track(ptr, layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.allocations.increment();
            self.track(ptr, layout.size());
        }
        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // Untrack first: once freed, the address may be handed out again.
        self.deallocations.increment();
        self.untrack(ptr, layout.size());
        System.dealloc(ptr, layout);
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let was_ours = self.untrack(ptr, layout.size());
        let new_ptr = System.realloc(ptr, layout, new_size);
        if new_ptr.is_null() {
            // The old block is still live.
            if was_ours {
                self.track(ptr, layout.size());
            }
        } else {
            self.reallocations.increment();
            self.track(new_ptr, new_size);
        }
        new_ptr
    }
}

impl ReplacementManager for CountingManager {
    fn name(&self) -> &'static str {
        self.name
    }

    fn initialize(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    fn can_install(&self, table: &EntryTable) -> Detection {
        if !self.is_initialized() {
            return Detection::Inconclusive;
        }
        let active = table.active();
        let ours = self.entry.get().map_or(false, |entry| std::ptr::eq(entry, active));
        if ours || (!table.is_original() && active.name() == self.name) {
            Detection::Conflict
        } else {
            Detection::Compatible
        }
    }

    fn install(&'static self, table: &EntryTable) -> Result<(), InstallError> {
        table.substitute(self.entry_points())
    }

    fn live_allocations(&self) -> Option<usize> {
        if self.foreign_frees.get() > 0 || self.untracked_blocks.get() > 0 {
            return None;
        }
        Some(self.live_blocks.get())
    }

    fn uninstall(&'static self, table: &EntryTable) -> Result<(), InstallError> {
        table.restore(self.entry_points())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaked(name: &'static str) -> &'static CountingManager {
        Box::leak(Box::new(CountingManager::new(name)))
    }

    #[test]
    fn test_counts_requests() {
        let manager = leaked("counting");
        let layout = Layout::from_size_align(64, 8).unwrap();

        unsafe {
            let ptr = manager.alloc(layout);
            assert!(!ptr.is_null());
            assert_eq!(manager.live_allocations(), Some(1));
            let ptr = manager.realloc(ptr, layout, 256);
            assert_eq!(manager.stats().live_bytes, 256);
            manager.dealloc(ptr, Layout::from_size_align(256, 8).unwrap());
        }

        let stats = manager.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reallocations, 1);
        assert_eq!(stats.deallocations, 1);
        assert_eq!(stats.live_blocks, 0);
        assert_eq!(stats.live_bytes, 0);
    }

    #[test]
    fn test_foreign_free_makes_count_unknown() {
        let manager = leaked("counting");
        let layout = Layout::from_size_align(32, 8).unwrap();

        unsafe {
            let early = System.alloc(layout);
            let ours = manager.alloc(layout);
            assert_eq!(manager.live_allocations(), Some(1));

            manager.dealloc(early, layout);
            assert_eq!(manager.stats().live_blocks, 1);
            assert_eq!(manager.stats().foreign_frees, 1);
            assert_eq!(manager.live_allocations(), None);

            manager.dealloc(ours, layout);
        }
        assert_eq!(manager.stats().live_blocks, 0);
        assert_eq!(manager.live_allocations(), None);
    }

    #[test]
    fn test_foreign_realloc_is_adopted_but_count_unknown() {
        let manager = leaked("counting");
        let layout = Layout::from_size_align(16, 8).unwrap();

        unsafe {
            let early = System.alloc(layout);
            let moved = manager.realloc(early, layout, 64);
            assert!(!moved.is_null());
            assert_eq!(manager.stats().live_blocks, 1);
            assert_eq!(manager.live_allocations(), None);
            manager.dealloc(moved, Layout::from_size_align(64, 8).unwrap());
        }
        assert_eq!(manager.stats().live_blocks, 0);
    }

    #[test]
    fn test_uninitialized_detection_is_inconclusive() {
        let manager = leaked("counting");
        let table = EntryTable::system();
        assert_eq!(manager.can_install(&table), Detection::Inconclusive);

        manager.initialize();
        assert_eq!(manager.can_install(&table), Detection::Compatible);
    }

    #[test]
    fn test_same_allocator_conflicts() {
        let first = leaked("shared-name");
        let second = leaked("shared-name");
        let table: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
        first.initialize();
        second.initialize();

        first.install(table).unwrap();
        assert_eq!(first.can_install(table), Detection::Conflict);
        assert_eq!(second.can_install(table), Detection::Conflict);
    }

    #[test]
    fn test_install_and_restore() {
        let manager = leaked("counting");
        let table: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
        manager.initialize();

        manager.install(table).unwrap();
        assert_eq!(table.active().name(), "counting");

        manager.uninstall(table).unwrap();
        assert!(table.is_original());
    }
}
