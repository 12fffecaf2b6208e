//! Process-wide allocation entry points.
//!
//! [`EntryTable`] is the one switch every allocation request passes through.
//! It implements [`GlobalAlloc`] by forwarding to whichever [`EntryPoints`]
//! are active, so a process opts in with:
//!
//! ```rust,ignore
//! use allocswap::EntryTable;
//!
//! #[global_allocator]
//! static ENTRY: EntryTable = EntryTable::system();
//! ```
//!
//! The table starts on its original entry points and moves to a replacement
//! with a single compare-and-swap.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::api::error::InstallError;
use crate::sync::atomics::AtomicCounter;

/// A named set of allocation entry points.
pub struct EntryPoints {
    name: &'static str,
    target: &'static (dyn GlobalAlloc + Sync),
}

impl EntryPoints {
    /// Create entry points that route to `target`.
    pub const fn new(name: &'static str, target: &'static (dyn GlobalAlloc + Sync)) -> Self {
        Self { name, target }
    }

    /// The name these entry points were registered under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn same_as(&self, other: &EntryPoints) -> bool {
        std::ptr::eq(self, other)
    }
}

impl std::fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoints").field("name", &self.name).finish()
    }
}

/// Entry points of the platform's default allocator.
pub const SYSTEM_ENTRY_POINTS: EntryPoints = EntryPoints::new("system", &System);

/// The process's switchable allocation entry points.
pub struct EntryTable {
    active: AtomicPtr<EntryPoints>,
    original: &'static EntryPoints,
    original_requests: AtomicCounter,
    replacement_requests: AtomicCounter,
}

impl EntryTable {
    /// Create a table whose original entry points are `original`.
    pub const fn new(original: &'static EntryPoints) -> Self {
        Self {
            active: AtomicPtr::new(original as *const EntryPoints as *mut EntryPoints),
            original,
            original_requests: AtomicCounter::new(0),
            replacement_requests: AtomicCounter::new(0),
        }
    }

    /// Create a table backed by the system allocator.
    ///
    /// Each table gets its own promoted copy of [`SYSTEM_ENTRY_POINTS`];
    /// identity checks are always made against the table's own original.
    pub const fn system() -> Self {
        Self::new(&SYSTEM_ENTRY_POINTS)
    }

    /// The entry points currently serving requests.
    #[inline]
    pub fn active(&self) -> &'static EntryPoints {
        // SAFETY: `active` only ever holds pointers derived from
        // `&'static EntryPoints`.
        unsafe { &*self.active.load(Ordering::Acquire) }
    }

    /// The entry points the table was created with.
    pub fn original(&self) -> &'static EntryPoints {
        self.original
    }

    /// Whether the original entry points are still active.
    pub fn is_original(&self) -> bool {
        self.active().same_as(self.original)
    }

    /// Whether `entry` is the active set of entry points.
    pub fn is_active(&self, entry: &EntryPoints) -> bool {
        self.active().same_as(entry)
    }

    /// Requests served by the original entry points so far.
    pub fn original_requests(&self) -> u64 {
        self.original_requests.get()
    }

    /// Requests served by replacement entry points so far.
    pub fn replacement_requests(&self) -> u64 {
        self.replacement_requests.get()
    }

    /// Route all subsequent requests to `replacement`.
    ///
    /// Succeeds only while the original entry points are active, so of two
    /// racing substitutions at most one takes effect.
    pub fn substitute(&self, replacement: &'static EntryPoints) -> Result<(), InstallError> {
        self.swap(self.original, replacement)
    }

    /// Route requests back to the original entry points.
    ///
    /// Succeeds only while `current` is the active set.
    pub fn restore(&self, current: &'static EntryPoints) -> Result<(), InstallError> {
        self.swap(current, self.original)
    }

    fn swap(&self, expected: &'static EntryPoints, new: &'static EntryPoints) -> Result<(), InstallError> {
        let expected = expected as *const EntryPoints as *mut EntryPoints;
        let new = new as *const EntryPoints as *mut EntryPoints;

        self.active
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|found| InstallError::EntryPointsChanged {
                // SAFETY: see `active`.
                found: unsafe { (*found).name },
            })
    }

    #[inline]
    fn route(&self) -> &'static (dyn GlobalAlloc + Sync) {
        let entry = self.active();
        if entry.same_as(self.original) {
            self.original_requests.increment();
        } else {
            self.replacement_requests.increment();
        }
        entry.target
    }
}

impl std::fmt::Debug for EntryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryTable")
            .field("active", &self.active().name)
            .field("original", &self.original.name)
            .finish()
    }
}

unsafe impl GlobalAlloc for EntryTable {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.route().alloc(layout)
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.route().alloc_zeroed(layout)
    }

    // Blocks allocated before a substitution are freed through whichever
    // entry points are active at free time.
    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.route().dealloc(ptr, layout)
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.route().realloc(ptr, layout, new_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static OTHER: EntryPoints = EntryPoints::new("other", &System);
    static THIRD: EntryPoints = EntryPoints::new("third", &System);

    #[test]
    fn test_table_starts_on_original() {
        let table = EntryTable::system();
        assert!(table.is_original());
        assert_eq!(table.active().name(), "system");
        assert_eq!(table.original_requests(), 0);
    }

    #[test]
    fn test_substitute_then_restore() {
        let table = EntryTable::system();
        table.substitute(&OTHER).unwrap();
        assert!(table.is_active(&OTHER));
        assert!(!table.is_original());

        table.restore(&OTHER).unwrap();
        assert!(table.is_original());
    }

    #[test]
    fn test_second_substitution_fails() {
        let table = EntryTable::system();
        table.substitute(&OTHER).unwrap();

        let err = table.substitute(&THIRD).unwrap_err();
        assert_eq!(err, InstallError::EntryPointsChanged { found: "other" });
        assert!(table.is_active(&OTHER));
    }

    #[test]
    fn test_requests_are_attributed() {
        let table = EntryTable::system();
        let layout = Layout::from_size_align(64, 8).unwrap();

        unsafe {
            let ptr = table.alloc(layout);
            assert!(!ptr.is_null());
            table.dealloc(ptr, layout);
        }
        assert_eq!(table.original_requests(), 2);

        table.substitute(&OTHER).unwrap();
        unsafe {
            let ptr = table.alloc_zeroed(layout);
            assert!(!ptr.is_null());
            assert_eq!(*ptr, 0);
            let ptr = table.realloc(ptr, layout, 128);
            assert!(!ptr.is_null());
            table.dealloc(ptr, Layout::from_size_align(128, 8).unwrap());
        }
        assert_eq!(table.original_requests(), 2);
        assert_eq!(table.replacement_requests(), 3);
    }
}
