//! Normalization applied to everything a collector emits.
//!
//! - [`timestamp`]: multi-epoch timestamp decoding to UTC ISO-8601
//! - [`redact`]: credential redaction for text and structured payloads
//! - [`heuristics`]: token estimates, model identification and previews

pub mod heuristics;
pub mod redact;
pub mod timestamp;

pub use heuristics::{cap_raw_data, content_preview, estimate_tokens, identify_model};
pub use redact::{contains_credentials, is_sensitive_key, redact_credentials, redact_json, safe_error_message};
pub use timestamp::{normalize_json_timestamp, normalize_timestamp, parse_iso, RawTimestamp};
