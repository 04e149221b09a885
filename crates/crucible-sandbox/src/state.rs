//! Shared state for Extism host functions.
//!
//! [`HostState`] is wrapped in [`extism::UserData`] and shared across all
//! host function invocations of one isolated runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crucible_core::FaultCode;

use crate::provision::DirectoryGrant;

/// Shared state accessible to all host functions via `UserData<HostState>`.
#[derive(Debug)]
pub(crate) struct HostState {
    /// Directories the guest may touch.
    pub(crate) grants: Arc<[DirectoryGrant]>,
    /// Largest file the guest may read or write.
    pub(crate) max_file_bytes: u64,
    /// Captured console output.
    pub(crate) stdout: String,
    /// Output beyond this many bytes is dropped.
    pub(crate) max_output_bytes: usize,
    /// Set once output was dropped.
    pub(crate) truncated: bool,
    /// Key/value table backing `Core.Collections.Table`.
    pub(crate) table: HashMap<String, String>,
    /// Fault raised by generated code right before it traps.
    pub(crate) fault: Option<FaultCode>,
    /// Set by the watchdog; long-running host calls poll it.
    pub(crate) interrupted: Arc<AtomicBool>,
}

impl HostState {
    pub(crate) fn new(
        grants: Arc<[DirectoryGrant]>,
        max_output_bytes: usize,
        max_file_bytes: u64,
    ) -> Self {
        Self {
            grants,
            max_file_bytes,
            stdout: String::new(),
            max_output_bytes,
            truncated: false,
            table: HashMap::new(),
            fault: None,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Forget everything a previous invocation left behind.
    pub(crate) fn reset(&mut self) {
        self.stdout.clear();
        self.truncated = false;
        self.table.clear();
        self.fault = None;
        self.interrupted.store(false, Ordering::SeqCst);
    }

    /// Append console output, honouring the cap on a char boundary.
    pub(crate) fn write_stdout(&mut self, text: &str) {
        if self.truncated {
            return;
        }
        let room = self.max_output_bytes.saturating_sub(self.stdout.len());
        if text.len() <= room {
            self.stdout.push_str(text);
            return;
        }
        let mut cut = room;
        while !text.is_char_boundary(cut) {
            cut = cut.saturating_sub(1);
        }
        self.stdout.push_str(&text[..cut]);
        self.truncated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(cap: usize) -> HostState {
        HostState::new(Arc::from(Vec::new()), cap, 1024)
    }

    #[test]
    fn test_stdout_cap_truncates_on_char_boundary() {
        let mut state = state(4);
        state.write_stdout("ab");
        state.write_stdout("cé!");
        assert_eq!(state.stdout, "abc");
        assert!(state.truncated);
        state.write_stdout("x");
        assert_eq!(state.stdout, "abc");
    }

    #[test]
    fn test_reset_clears_invocation_state() {
        let mut state = state(16);
        state.write_stdout("hi");
        state.table.insert("k".to_owned(), "v".to_owned());
        state.fault = Some(FaultCode::NullReference);
        state.interrupted.store(true, Ordering::SeqCst);
        state.reset();
        assert!(state.stdout.is_empty());
        assert!(state.table.is_empty());
        assert!(state.fault.is_none());
        assert!(!state.interrupted.load(Ordering::SeqCst));
    }
}
