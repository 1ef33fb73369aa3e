//! Security policy applied while reading evidence.
//!
//! The policy bounds every read, names the files whose content must never be
//! extracted, and carries the keyword list used to drop carved strings.

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    CARVE_MIN_LENGTH, CARVE_SENSITIVE_KEYWORDS, CONTENT_PREVIEW_MAX, CREDENTIAL_FILE_NAMES,
    MAX_FILE_READ_BYTES, RAW_DATA_MAX_CHARS,
};
use crate::normalizer::{cap_raw_data, content_preview};

/// Security settings for a collection run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecurityPolicy {
    /// Per-file bound checked before any hash or content read (bytes)
    pub max_file_bytes: u64,

    /// Maximum characters in a content preview
    pub preview_max_chars: usize,

    /// raw_data is dropped at or above this many characters
    pub raw_data_max_chars: usize,

    /// File names whose content is never extracted
    pub credential_file_names: Vec<String>,

    /// Extensions of key material that is never extracted
    pub blocked_extensions: Vec<String>,

    /// Minimum run length for string carving
    pub carve_min_length: usize,

    /// Carved strings containing any of these (case-insensitive) are dropped
    pub carve_keywords: Vec<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            max_file_bytes: MAX_FILE_READ_BYTES,
            preview_max_chars: CONTENT_PREVIEW_MAX,
            raw_data_max_chars: RAW_DATA_MAX_CHARS,
            credential_file_names: CREDENTIAL_FILE_NAMES.iter().map(|s| s.to_string()).collect(),
            blocked_extensions: vec![
                ".key".to_string(),
                ".pem".to_string(),
                ".p12".to_string(),
                ".pfx".to_string(),
                ".keystore".to_string(),
            ],
            carve_min_length: CARVE_MIN_LENGTH,
            carve_keywords: CARVE_SENSITIVE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SecurityPolicy {
    /// Check if a file extension is blocked.
    pub fn is_extension_blocked(&self, path: &Path) -> bool {
        if let Some(extension) = path.extension() {
            let ext = extension.to_string_lossy().to_lowercase();
            self.blocked_extensions.iter().any(|blocked| {
                blocked.to_lowercase() == format!(".{}", ext) || blocked.to_lowercase() == ext
            })
        } else {
            false
        }
    }

    /// Whether the file is a credential store whose content must not be read.
    pub fn is_credential_file(&self, path: &Path) -> bool {
        let name_matches = path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .map(|name| {
                self.credential_file_names
                    .iter()
                    .any(|blocked| blocked.to_lowercase() == name)
            })
            .unwrap_or(false);
        name_matches || self.is_extension_blocked(path)
    }

    /// Apply the size bound.
    pub fn is_file_size_allowed(&self, size: u64) -> bool {
        size <= self.max_file_bytes
    }

    /// Redacted preview capped to the configured length.
    pub fn preview(&self, text: &str) -> String {
        content_preview(text, self.preview_max_chars)
    }

    /// Redacted raw payload, kept only below the configured cap.
    pub fn keep_raw(&self, raw: String) -> Option<String> {
        cap_raw_data(raw, self.raw_data_max_chars)
    }

    /// Whether a carved run contains a sensitive keyword.
    pub fn has_carve_keyword(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.carve_keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
    }
}

/// Security audit event types.
#[derive(Debug, Clone, Serialize)]
pub enum SecurityEvent {
    /// A rule path or root failed validation
    PathValidationFailed { path: String, reason: String },

    /// A credential store was found and left unread
    CredentialFileSkipped { path: String },

    /// Access to part of a root was denied
    PermissionDenied { path: String },
}

/// Log a security event.
pub fn log_security_event(event: SecurityEvent) {
    match event {
        SecurityEvent::PathValidationFailed { path, reason } => {
            debug!("Security: Path validation failed for '{}': {}", path, reason);
        }
        SecurityEvent::CredentialFileSkipped { path } => {
            debug!("Security: Credential file skipped: '{}'", path);
        }
        SecurityEvent::PermissionDenied { path } => {
            debug!("Security: Permission denied: '{}'", path);
        }
    }
}
