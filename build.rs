//! Build script for allocswap.
//!
//! Provides build-time notes about enabled features and target caveats for
//! users wiring allocswap into a host.

use std::env;

fn main() {
    // Re-run if features change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_TRACY");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");

    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let tracy_enabled = env::var("CARGO_FEATURE_TRACY").is_ok();
    let log_enabled = env::var("CARGO_FEATURE_LOG").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // =========================================================================
    // Feature-specific diagnostics
    // =========================================================================

    if debug_enabled {
        emit_info("Debug features enabled");
        emit_note("Double-install reports include the first installation's backtrace.");

        if is_release {
            emit_warning("Debug features enabled in release build!");
            emit_note("Backtrace capture happens once, at installation.");
        }
    }

    if tracy_enabled {
        emit_info("Tracy integration enabled: lifecycle diagnostics become Tracy messages");
    }

    if is_release && !log_enabled && env::var("CARGO_FEATURE_DIAGNOSTICS").is_err() {
        emit_note("Release build without `log` or `diagnostics`: lifecycle diagnostics are silent.");
        emit_note("Gate rejections and skipped uninstalls remain visible via ProcessContext::stats().");
    }

    check_target();
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_info(msg: &str) {
    println!("cargo:warning=[allocswap] {}", msg);
}

fn emit_note(msg: &str) {
    println!("cargo:warning=[allocswap]    {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[allocswap] warning: {}", msg);
}

// =============================================================================
// Target checks
// =============================================================================

fn check_target() {
    let target = env::var("TARGET").unwrap_or_default();

    if target.contains("wasm") {
        emit_warning("WebAssembly target detected");
        emit_note("Module startup/shutdown hooks must be driven by the embedder.");
    }
}
