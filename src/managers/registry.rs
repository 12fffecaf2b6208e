//! Fixed-capacity registry of block addresses.
//!
//! Lets a manager tell its own blocks apart from blocks the original entry
//! points handed out before substitution. Lock-free and allocation-free, so
//! it is safe to touch from inside `GlobalAlloc` entry points.
//!
//! Open addressing with linear probing. Removed slots become tombstones and
//! are never reset to empty, so a probe chain is never cut short.

use std::sync::atomic::{AtomicUsize, Ordering};

const CAPACITY: usize = 1 << 12;
const MASK: usize = CAPACITY - 1;

const EMPTY: usize = 0;
const TOMBSTONE: usize = 1;

pub(crate) struct BlockRegistry {
    slots: [AtomicUsize; CAPACITY],
}

impl BlockRegistry {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const SLOT: AtomicUsize = AtomicUsize::new(EMPTY);
        Self {
            slots: [SLOT; CAPACITY],
        }
    }

    /// Record `ptr` as live. Returns `false` if the registry is full.
    pub fn insert(&self, ptr: *mut u8) -> bool {
        let key = ptr as usize;
        debug_assert!(key > TOMBSTONE);

        let mut idx = hash_ptr(key) & MASK;
        for _ in 0..CAPACITY {
            let slot = &self.slots[idx];
            let current = slot.load(Ordering::Acquire);
            if (current == EMPTY || current == TOMBSTONE)
                && slot
                    .compare_exchange(current, key, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                return true;
            }
            idx = (idx + 1) & MASK;
        }
        false
    }

    /// Forget `ptr`. Returns `false` if it was never recorded.
    pub fn remove(&self, ptr: *mut u8) -> bool {
        let key = ptr as usize;

        let mut idx = hash_ptr(key) & MASK;
        for _ in 0..CAPACITY {
            let slot = &self.slots[idx];
            match slot.load(Ordering::Acquire) {
                EMPTY => return false,
                current if current == key => {
                    return slot
                        .compare_exchange(key, TOMBSTONE, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok();
                }
                _ => idx = (idx + 1) & MASK,
            }
        }
        false
    }
}

/// splitmix64 finalizer.
#[inline]
fn hash_ptr(key: usize) -> usize {
    let mut x = key as u64;
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x as usize
}
