//! Public API for allocswap.
//!
//! The installation protocol: gate, installer, uninstaller and the binder
//! that drives them from host hooks.

pub mod binder;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod installer;
pub mod stats;
pub mod uninstaller;
