//! Diagnostic kinds and predefined lifecycle diagnostics.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A hard error - something is definitely wrong.
    Error,
    /// A warning - something is probably wrong or suboptimal.
    Warning,
    /// Informational: an expected decision worth recording.
    Note,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Note => "note",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "AS201").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional additional context.
    pub note: Option<&'static str>,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self::with_kind(DiagnosticKind::Error, code, message)
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self::with_kind(DiagnosticKind::Warning, code, message)
    }

    /// Create a new informational diagnostic.
    pub const fn note(code: &'static str, message: &'static str) -> Self {
        Self::with_kind(DiagnosticKind::Note, code, message)
    }

    const fn with_kind(kind: DiagnosticKind, code: &'static str, message: &'static str) -> Self {
        Self {
            kind,
            code,
            message,
            note: None,
            help: None,
        }
    }

    /// Add a note to this diagnostic.
    pub const fn with_note(mut self, note: &'static str) -> Self {
        self.note = Some(note);
        self
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// AS1xx - Compatibility gate
// =============================================================================

/// AS101: Substitution rejected by the compatibility gate.
pub const AS101: Diagnostic = Diagnostic::note(
    "AS101",
    "allocator substitution rejected by the compatibility gate"
).with_note("the host's original allocator remains active for the whole process")
 .with_help("check for another replacement allocator, or a module sharing the runtime allocator");

/// AS102: Conflict detection could not reach a verdict.
pub const AS102: Diagnostic = Diagnostic::note(
    "AS102",
    "conflicting-allocator detection was inconclusive"
).with_note("an inconclusive check is treated as a rejection")
 .with_help("make the replacement manager's can_install() report Compatible or Conflict explicitly");

// =============================================================================
// AS2xx - Installer
// =============================================================================

/// AS201: Installer invoked a second time.
pub const AS201: Diagnostic = Diagnostic::error(
    "AS201",
    "installer invoked after the replacement allocator was already installed"
).with_note("no second substitution was performed")
 .with_help("the lifecycle binder is wired more than once; bind each process context exactly once");

/// AS202: Installer invoked before the manager was initialized.
pub const AS202: Diagnostic = Diagnostic::error(
    "AS202",
    "installer invoked before the replacement allocator was initialized"
).with_note("allocation requests could observe a partially initialized manager")
 .with_help("run the startup hook, or initialize the manager before installing");

/// AS203: Installer invoked after the gate rejected substitution.
pub const AS203: Diagnostic = Diagnostic::error(
    "AS203",
    "installer invoked after the compatibility gate rejected substitution"
).with_note("the rejection is final for this process context")
 .with_help("only install after a Permitted gate verdict");

// =============================================================================
// AS3xx - Uninstall
// =============================================================================

/// AS301: Shutdown hook left the replacement allocator in place.
pub const AS301: Diagnostic = Diagnostic::note(
    "AS301",
    "uninstall skipped: live allocations may still reference the replacement allocator"
).with_note("memory owned by the replacement allocator persists until process exit");

/// AS302: The manager refused an uninstall that was otherwise safe.
pub const AS302: Diagnostic = Diagnostic::warning(
    "AS302",
    "replacement allocator could not restore the original entry points"
).with_note("nothing was restored; the replacement allocator stays active");

// =============================================================================
// AS4xx - Host binding
// =============================================================================

/// AS401: Binder already registered for this context.
pub const AS401: Diagnostic = Diagnostic::warning(
    "AS401",
    "lifecycle hooks are already registered for this process context"
).with_help("bind once per process context; the first registration stays in effect");

/// AS402: Startup hook ran again.
pub const AS402: Diagnostic = Diagnostic::warning(
    "AS402",
    "startup hook invoked more than once"
).with_note("the repeated invocation was ignored");

/// AS403: Host cannot order the startup hook ahead of module code.
pub const AS403: Diagnostic = Diagnostic::warning(
    "AS403",
    "host does not guarantee the startup hook runs before module code"
).with_note("the gate will reject substitution if any request already reached the original allocator");

// =============================================================================
// AS9xx - Fatal
// =============================================================================

/// AS901: Installation failed after the gate permitted it.
pub const AS901: Diagnostic = Diagnostic::error(
    "AS901",
    "replacement allocator failed to install after the gate permitted it"
).with_note("allocator ownership is indeterminate; continuing could corrupt memory")
 .with_help("the process will be terminated");
