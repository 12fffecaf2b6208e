//! Synchronization primitives.
//!
//! Thin wrappers over std or parking_lot mutexes, plus the relaxed counters
//! used for lifecycle statistics.

pub(crate) mod atomics;
pub(crate) mod mutex;
