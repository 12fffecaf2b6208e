//! Installation-site capture.
//!
//! A double installation is a wiring bug somewhere else in the program.
//! Keeping the first installer's backtrace lets the report for the second
//! call point at both sites.

use crate::sync::mutex::Mutex;

/// Backtrace of the first successful installation.
pub(crate) struct InstallSite {
    trace: Mutex<Option<String>>,
}

impl InstallSite {
    pub(crate) fn new() -> Self {
        Self {
            trace: Mutex::new(None),
        }
    }

    /// Capture the current backtrace, unless one is already recorded.
    pub(crate) fn record(&self) {
        let mut trace = self.trace.lock();
        if trace.is_none() {
            *trace = Some(format!("{:?}", backtrace::Backtrace::new()));
        }
    }

    /// The recorded backtrace, if any.
    pub(crate) fn get(&self) -> Option<String> {
        self.trace.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_site_wins() {
        let site = InstallSite::new();
        assert!(site.get().is_none());

        site.record();
        let first = site.get();
        assert!(first.is_some());

        site.record();
        assert_eq!(site.get(), first);
    }
}
