//! Permission error tracking and reporting
//!
//! Paths that could not be read because of permissions are collected during
//! a run and summarized once at the end, with guidance on granting access.

use log::warn;
use std::collections::BTreeSet;
use std::io;
use std::sync::{Arc, Mutex};

/// Tracks paths that failed due to permission errors
#[derive(Debug, Clone, Default)]
pub struct PermissionTracker {
    failed_paths: Arc<Mutex<BTreeSet<String>>>,
}

impl PermissionTracker {
    /// Create a new permission tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a permission failure for a path
    pub fn record_permission_failure(&self, path: &str) {
        if let Ok(mut failures) = self.failed_paths.lock() {
            failures.insert(path.to_string());
        }
    }

    /// Check if an error message indicates a permission problem
    pub fn is_permission_error(error_msg: &str) -> bool {
        error_msg.contains("Permission denied")
            || error_msg.contains("PermissionDenied")
            || error_msg.contains("Access is denied")
            || error_msg.contains("Operation not permitted")
    }

    /// Whether an I/O error is a permission problem
    pub fn is_permission_io_error(error: &io::Error) -> bool {
        error.kind() == io::ErrorKind::PermissionDenied
            || Self::is_permission_error(&error.to_string())
    }

    /// Get the count of permission failures
    pub fn failure_count(&self) -> usize {
        self.failed_paths.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// Recorded paths, sorted
    pub fn failures(&self) -> Vec<String> {
        self.failed_paths
            .lock()
            .map(|f| f.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Report permission failures and provide guidance
    pub fn report_failures(&self, source: &str) {
        let failures = self.failures();
        if failures.is_empty() {
            return;
        }

        warn!(
            "{}: {} path(s) could not be read due to insufficient permissions:",
            source,
            failures.len()
        );
        for path in &failures {
            warn!("  • {}", path);
        }

        #[cfg(target_os = "macos")]
        warn!("  Grant Full Disk Access to the terminal in System Settings > Privacy & Security");

        #[cfg(target_os = "linux")]
        warn!("  Check ownership and mode of the listed paths with 'ls -la'");

        #[cfg(target_os = "windows")]
        warn!("  Ensure your user account can read the listed profile directories");

        warn!("  Collection continued for accessible paths.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_tracker() {
        let tracker = PermissionTracker::new();
        assert_eq!(tracker.failure_count(), 0);

        tracker.record_permission_failure("/home/u/.claude/projects");
        assert_eq!(tracker.failure_count(), 1);

        // Duplicate failures only counted once
        tracker.record_permission_failure("/home/u/.claude/projects");
        assert_eq!(tracker.failure_count(), 1);

        tracker.record_permission_failure("/home/u/Library/Safari");
        assert_eq!(
            tracker.failures(),
            vec![
                "/home/u/.claude/projects".to_string(),
                "/home/u/Library/Safari".to_string()
            ]
        );
    }

    #[test]
    fn test_clones_share_state() {
        let tracker = PermissionTracker::new();
        let clone = tracker.clone();
        clone.record_permission_failure("x");
        assert_eq!(tracker.failure_count(), 1);
    }

    #[test]
    fn test_permission_error_detection() {
        assert!(PermissionTracker::is_permission_error("Permission denied accessing file"));
        assert!(PermissionTracker::is_permission_error("Error: PermissionDenied"));
        assert!(PermissionTracker::is_permission_error("Access is denied"));
        assert!(!PermissionTracker::is_permission_error("File not found"));

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(PermissionTracker::is_permission_io_error(&err));
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(!PermissionTracker::is_permission_io_error(&err));
    }
}
