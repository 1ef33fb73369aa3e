use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::normalizer::{normalize_timestamp, redact_credentials, redact_json};

/// One canonical forensic record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Artifact {
    pub id: String,
    pub source_tool: String,
    pub artifact_type: String,
    pub timestamp: Option<String>,
    pub file_path: Option<String>,
    pub file_hash_sha256: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub file_modified: Option<String>,
    pub file_created: Option<String>,
    pub user: Option<String>,
    pub hostname: Option<String>,
    pub content_preview: Option<String>,
    pub raw_data: Option<String>,
    pub model_identified: Option<String>,
    pub conversation_id: Option<String>,
    pub message_role: Option<String>,
    pub token_estimate: Option<i64>,
    pub metadata: Option<Value>,
    pub collection_timestamp: String,
}

impl Artifact {
    /// New artifact with a random id, captured now.
    pub fn new(source_tool: impl Into<String>, artifact_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_tool: source_tool.into(),
            artifact_type: artifact_type.into(),
            collection_timestamp: now_iso(),
            ..Default::default()
        }
    }

    /// Copy sharing chain-of-custody fields, with its own id.
    ///
    /// Used when one file yields many artifacts: the file facts and digest
    /// are computed once on a template and every record derives from it.
    pub fn sibling(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            collection_timestamp: now_iso(),
            ..self.clone()
        }
    }

    /// Copy with every free-text field passed through redaction.
    ///
    /// The id, hash and timestamps are generated by the collector and are
    /// left as they are.
    pub fn sanitized(&self) -> Self {
        let redact = |field: &Option<String>| field.as_deref().map(redact_credentials);
        Self {
            id: self.id.clone(),
            source_tool: redact_credentials(&self.source_tool),
            artifact_type: redact_credentials(&self.artifact_type),
            timestamp: self.timestamp.clone(),
            file_path: redact(&self.file_path),
            file_hash_sha256: self.file_hash_sha256.clone(),
            file_size_bytes: self.file_size_bytes,
            file_modified: self.file_modified.clone(),
            file_created: self.file_created.clone(),
            user: redact(&self.user),
            hostname: redact(&self.hostname),
            content_preview: redact(&self.content_preview),
            raw_data: redact(&self.raw_data),
            model_identified: redact(&self.model_identified),
            conversation_id: redact(&self.conversation_id),
            message_role: redact(&self.message_role),
            token_estimate: self.token_estimate,
            metadata: self.metadata.as_ref().map(redact_json),
            collection_timestamp: self.collection_timestamp.clone(),
        }
    }
}

/// One collection session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CollectionRun {
    pub id: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub collectors_run: Vec<String>,
    pub total_artifacts: i64,
    pub errors: Vec<String>,
    pub hostname: Option<String>,
    pub username: Option<String>,
}

impl CollectionRun {
    /// Start a run now.
    pub fn start(hostname: Option<String>, username: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_time: now_iso(),
            end_time: None,
            collectors_run: Vec::new(),
            total_artifacts: 0,
            errors: Vec::new(),
            hostname,
            username,
        }
    }

    /// Stamp the end time.
    pub fn finish(&mut self) {
        self.end_time = Some(now_iso());
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Current time in normalized form.
pub fn now_iso() -> String {
    normalize_timestamp(chrono::Utc::now()).unwrap_or_default()
}
