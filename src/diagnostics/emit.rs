//! Diagnostic emission backend.
//!
//! Diagnostics go to stderr (debug builds, or the `diagnostics` feature), to
//! the `log` crate (feature `log`) and to Tracy (feature `tracy`). Emission
//! happens only from lifecycle hooks, never from allocation entry points.

use std::sync::atomic::{AtomicBool, Ordering};

use super::kind::{Diagnostic, DiagnosticKind};
use super::strict::strict_mode;

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Global flag to enable verbose diagnostics.
static VERBOSE_DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Enable verbose diagnostic output.
pub fn set_verbose(verbose: bool) {
    VERBOSE_DIAGNOSTICS.store(verbose, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Emit a diagnostic.
pub fn emit(diag: &Diagnostic) {
    write_backends(diag, None);
    apply_strict_mode(diag, None);
}

/// Emit a diagnostic with additional runtime context.
pub fn emit_with_context(diag: &Diagnostic, context: &str) {
    write_backends(diag, Some(context));
    apply_strict_mode(diag, Some(context));
}

/// Emit a diagnostic without applying strict mode.
///
/// Used right before a fatal policy runs, so strict mode cannot turn an
/// abort into an unwind.
pub(crate) fn report_with_context(diag: &Diagnostic, context: &str) {
    write_backends(diag, Some(context));
}

fn write_backends(diag: &Diagnostic, context: Option<&str>) {
    if is_suppressed() {
        return;
    }

    #[cfg(any(debug_assertions, feature = "diagnostics"))]
    emit_to_stderr(diag, context);

    #[cfg(feature = "log")]
    emit_to_log(diag, context);

    #[cfg(feature = "tracy")]
    emit_to_tracy(diag, context);

    #[cfg(not(any(debug_assertions, feature = "diagnostics", feature = "log", feature = "tracy")))]
    let _ = (diag, context);
}

// Strict mode applies even when output is suppressed.
fn apply_strict_mode(diag: &Diagnostic, context: Option<&str>) {
    if strict_mode().panics_on(diag.kind) {
        match context {
            Some(context) => panic!(
                "[allocswap][{}] {}\nContext: {}\nStrict mode enabled - {}s are fatal.",
                diag.code,
                diag.message,
                context,
                diag.kind.prefix()
            ),
            None => panic!(
                "[allocswap][{}] {}\nStrict mode enabled - {}s are fatal.",
                diag.code,
                diag.message,
                diag.kind.prefix()
            ),
        }
    }
}

#[cfg(any(debug_assertions, feature = "diagnostics"))]
fn emit_to_stderr(diag: &Diagnostic, context: Option<&str>) {
    use std::io::Write;

    let mut stderr = std::io::stderr().lock();
    let verbose = VERBOSE_DIAGNOSTICS.load(Ordering::Relaxed);

    let _ = writeln!(
        stderr,
        "[allocswap][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );
    if let Some(context) = context {
        let _ = writeln!(stderr, "  context: {}", context);
    }
    if let Some(note) = diag.note {
        let _ = writeln!(stderr, "  note: {}", note);
    }
    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }
    if verbose && diag.kind == DiagnosticKind::Error {
        let _ = writeln!(stderr, "  hint: enable the `debug` feature to capture the installation site");
    }
    let _ = writeln!(stderr);
}

#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic, context: Option<&str>) {
    let context = context.unwrap_or("-");
    match diag.kind {
        DiagnosticKind::Error => log::error!("[{}] {} ({})", diag.code, diag.message, context),
        DiagnosticKind::Warning => log::warn!("[{}] {} ({})", diag.code, diag.message, context),
        DiagnosticKind::Note => log::info!("[{}] {} ({})", diag.code, diag.message, context),
    }
    if let Some(note) = diag.note {
        log::debug!("  note: {}", note);
    }
    if let Some(help) = diag.help {
        log::debug!("  help: {}", help);
    }
}

#[cfg(feature = "tracy")]
fn emit_to_tracy(diag: &Diagnostic, context: Option<&str>) {
    if let Some(client) = tracy_client::Client::running() {
        let text = match context {
            Some(context) => format!("[{}] {}: {}", diag.code, diag.message, context),
            None => format!("[{}] {}", diag.code, diag.message),
        };
        client.message(&text, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::AS301;

    #[test]
    fn test_suppression() {
        suppress_diagnostics(true);
        assert!(is_suppressed());
        emit(&AS301);
        suppress_diagnostics(false);
        assert!(!is_suppressed());
    }
}
