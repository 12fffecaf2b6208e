//! Lifecycle configuration.
//!
//! Resolved once, when a [`ProcessContext`](crate::ProcessContext) is
//! created. Nothing in the lifecycle layer senses the environment later.

/// What to do when installation fails after the gate permitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalPolicy {
    /// Terminate the process with `std::process::abort`.
    Abort,
    /// Panic. Intended for test harnesses that need to observe the failure.
    Panic,
}

/// Configuration for the installation protocol.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// The host guarantees the shutdown hook is the final teardown of the
    /// owning module, so a verified uninstall may be attempted (default: false).
    pub safe_uninstall_supported: bool,

    /// The module shares the host runtime's allocator state (default: false).
    pub shared_runtime_allocator: bool,

    /// Reject substitution if the original entry points have already served
    /// any request (default: false).
    pub require_pristine: bool,

    /// Fatal install failure handling (default: Abort).
    pub fatal_policy: FatalPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            safe_uninstall_supported: false,
            shared_runtime_allocator: false,
            require_pristine: false,
            fatal_policy: FatalPolicy::Abort,
        }
    }
}

impl LifecycleConfig {
    /// Read the configuration from the environment.
    ///
    /// - `ALLOCSWAP_SAFE_UNINSTALL` -> `safe_uninstall_supported`
    /// - `ALLOCSWAP_SHARED_RUNTIME` -> `shared_runtime_allocator`
    /// - `ALLOCSWAP_REQUIRE_PRISTINE` -> `require_pristine`
    ///
    /// Unset or unparseable variables keep their defaults. Also applies
    /// `ALLOCSWAP_STRICT` to the diagnostics strict mode.
    pub fn from_env() -> Self {
        crate::diagnostics::init_from_env();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, default: bool| lookup(key).and_then(|v| parse_flag(&v)).unwrap_or(default);
        let defaults = Self::default();

        Self {
            safe_uninstall_supported: flag("ALLOCSWAP_SAFE_UNINSTALL", defaults.safe_uninstall_supported),
            shared_runtime_allocator: flag("ALLOCSWAP_SHARED_RUNTIME", defaults.shared_runtime_allocator),
            require_pristine: flag("ALLOCSWAP_REQUIRE_PRISTINE", defaults.require_pristine),
            fatal_policy: defaults.fatal_policy,
        }
    }

    /// Builder pattern: declare whether a verified uninstall is possible.
    pub fn with_safe_uninstall(mut self, supported: bool) -> Self {
        self.safe_uninstall_supported = supported;
        self
    }

    /// Builder pattern: declare a shared runtime allocator.
    pub fn with_shared_runtime_allocator(mut self, shared: bool) -> Self {
        self.shared_runtime_allocator = shared;
        self
    }

    /// Builder pattern: require untouched entry points at install time.
    pub fn with_require_pristine(mut self, require: bool) -> Self {
        self.require_pristine = require;
        self
    }

    /// Builder pattern: set the fatal failure policy.
    pub fn with_fatal_policy(mut self, policy: FatalPolicy) -> Self {
        self.fatal_policy = policy;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_conservative() {
        let config = LifecycleConfig::default();
        assert!(!config.safe_uninstall_supported);
        assert!(!config.shared_runtime_allocator);
        assert!(!config.require_pristine);
        assert_eq!(config.fatal_policy, FatalPolicy::Abort);
    }

    #[test]
    fn test_from_lookup() {
        let config = LifecycleConfig::from_lookup(|key| match key {
            "ALLOCSWAP_SAFE_UNINSTALL" => Some("yes".to_string()),
            "ALLOCSWAP_REQUIRE_PRISTINE" => Some("maybe".to_string()),
            _ => None,
        });
        assert!(config.safe_uninstall_supported);
        assert!(!config.shared_runtime_allocator);
        // Unparseable values keep the default.
        assert!(!config.require_pristine);
    }
}
