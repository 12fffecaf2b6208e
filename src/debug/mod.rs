//! Debug utilities for tracking where installation happened.
//!
//! Only compiled when the `debug` feature is enabled.

mod install_site;

pub(crate) use install_site::InstallSite;
