//! Mock implementations for testing.

use std::sync::{Arc, Mutex};

use crucible_core::{CompilationResult, StatusSink};

/// Status sink that records every status line and compilation result.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    statuses: Arc<Mutex<Vec<String>>>,
    results: Arc<Mutex<Vec<CompilationResult>>>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status lines received so far, in order.
    #[must_use]
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Compilation results received so far.
    #[must_use]
    pub fn results(&self) -> Vec<CompilationResult> {
        self.results.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl StatusSink for RecordingSink {
    fn on_status(&self, status: &str) {
        if let Ok(mut guard) = self.statuses.lock() {
            guard.push(status.to_owned());
        }
    }

    fn on_result(&self, result: &CompilationResult) {
        if let Ok(mut guard) = self.results.lock() {
            guard.push(result.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::Phase;

    #[test]
    fn test_records_in_order() {
        let sink = RecordingSink::new();
        sink.on_phase(Phase::Provisioning);
        sink.on_phase(Phase::Compiling);
        sink.on_result(&CompilationResult::ok());

        assert_eq!(
            sink.statuses(),
            vec!["Creating Sandbox Environment..", "Compiling Code.."]
        );
        assert_eq!(sink.results().len(), 1);
        assert!(sink.results()[0].success);
    }

    #[test]
    fn test_clones_share_storage() {
        let sink = RecordingSink::new();
        let clone = sink.clone();
        clone.on_status("x");
        assert_eq!(sink.statuses(), vec!["x"]);
    }
}
