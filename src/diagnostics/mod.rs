//! Lifecycle diagnostics.
//!
//! This module provides:
//! - **Coded diagnostics**: rustc-style messages for every lifecycle decision
//!   that an operator may need to understand after the fact
//! - **Backends**: stderr, the `log` crate, and Tracy messages
//! - **Strict mode**: optional panic-on-error for CI
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | AS1xx | Compatibility gate decisions   |
//! | AS2xx | Installer misuse               |
//! | AS3xx | Uninstall decisions            |
//! | AS4xx | Host binding issues            |
//! | AS9xx | Fatal conditions               |

pub mod emit;
pub mod kind;
pub mod strict;

pub use emit::{emit, emit_with_context, is_suppressed, set_verbose, suppress_diagnostics};
pub use kind::{Diagnostic, DiagnosticKind};
pub use strict::{init_from_env, set_strict_mode, strict_mode, StrictMode, StrictModeGuard};

pub use kind::{AS101, AS102, AS201, AS202, AS203, AS301, AS302, AS401, AS402, AS403, AS901};
