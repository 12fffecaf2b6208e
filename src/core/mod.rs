//! Process-wide state: the entry table and the lifecycle record guarding it.

pub mod entry;
pub mod process;
